use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saturn_core::error::SaturnError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error for a single field.
    pub fn bad_request(field: &str, msg: impl Into<String>) -> Self {
        Self(SaturnError::invalid(field, msg).into())
    }

    pub fn join(e: tokio::task::JoinError) -> Self {
        Self(anyhow::anyhow!("task join error: {e}"))
    }
}

fn status_for(e: &SaturnError) -> StatusCode {
    match e {
        SaturnError::MonitorNotFound(_)
        | SaturnError::IncidentNotFound(_)
        | SaturnError::UserNotFound(_)
        | SaturnError::OrgNotFound(_)
        | SaturnError::WindowNotFound(_) => StatusCode::NOT_FOUND,
        SaturnError::Validation(_) => StatusCode::BAD_REQUEST,
        SaturnError::EmailExists(_) | SaturnError::InvalidTransition { .. } => StatusCode::CONFLICT,
        SaturnError::Unauthorized => StatusCode::UNAUTHORIZED,
        SaturnError::Forbidden(_) | SaturnError::MonitorLimit(_) => StatusCode::FORBIDDEN,
        SaturnError::Storage(_)
        | SaturnError::Io(_)
        | SaturnError::Yaml(_)
        | SaturnError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0.downcast_ref::<SaturnError>() {
            Some(SaturnError::Validation(issues)) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": issues }),
            ),
            Some(e) => (status_for(e), serde_json::json!({ "error": e.to_string() })),
            None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": self.0.to_string() }),
            ),
        };

        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
            let body = serde_json::json!({ "error": "Internal server error" });
            return (status, axum::Json(body)).into_response();
        }
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
