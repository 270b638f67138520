use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use saturn_core::error::{FieldIssue, SaturnError};

use crate::error::AppError;

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// `Json<T>` whose rejections render as 400 validation errors instead of
/// axum's plain-text 4xx.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError(
                SaturnError::Validation(vec![rejection_issue(&rejection)]).into(),
            )),
        }
    }
}

fn rejection_issue(rejection: &JsonRejection) -> FieldIssue {
    match rejection {
        JsonRejection::JsonDataError(e) => data_error_issue(&e.body_text()),
        JsonRejection::MissingJsonContentType(_) => {
            FieldIssue::new("body", "Expected request with `Content-Type: application/json`")
        }
        other => FieldIssue::new("body", other.body_text()),
    }
}

/// Split `"<path>: <message>"` out of a deserialization failure. Errors at
/// the document root carry no path.
fn data_error_issue(text: &str) -> FieldIssue {
    let detail = text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(text);
    match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(' ') => {
            FieldIssue::new(path, message)
        }
        _ => FieldIssue::new("body", detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_path_is_split_from_message() {
        let issue = data_error_issue(
            "Failed to deserialize the JSON body into the target type: name: invalid type: \
             integer `123`, expected a string at line 1 column 11",
        );
        assert_eq!(issue.field, "name");
        assert!(issue.message.starts_with("invalid type: integer `123`"));
    }

    #[test]
    fn nested_path_is_kept() {
        let issue = data_error_issue(
            "Failed to deserialize the JSON body into the target type: recurrence.days[0]: \
             invalid value",
        );
        assert_eq!(issue.field, "recurrence.days[0]");
    }

    #[test]
    fn root_error_falls_back_to_body() {
        let issue = data_error_issue(
            "Failed to deserialize the JSON body into the target type: missing field `orgId` \
             at line 1 column 2",
        );
        assert_eq!(issue.field, "body");
        assert!(issue.message.contains("missing field `orgId`"));
    }
}
