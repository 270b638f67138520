use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use saturn_core::account::{authenticate, User};
use saturn_core::SaturnError;

use crate::state::AppState;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "saturn_session";

/// The authenticated user, inserted into request extensions by
/// [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The raw token that authenticated the request.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Axum middleware that resolves the session token to a user.
///
/// The token is read from `Authorization: Bearer <token>` first, then from
/// the `saturn_session` cookie. Missing, unknown and expired sessions all get
/// a 401 JSON response.
pub async fn require_session(State(app): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(token) = session_token(&req) else {
        return unauthorized();
    };

    let store = app.store.clone();
    let now = chrono::Utc::now();
    let lookup = token.clone();
    let result =
        tokio::task::spawn_blocking(move || store.read(|tx| authenticate(tx, &lookup, now))).await;

    match result {
        Ok(Ok(user)) => {
            req.extensions_mut().insert(CurrentUser(user));
            req.extensions_mut().insert(SessionToken(token));
            next.run(req).await
        }
        Ok(Err(SaturnError::Unauthorized)) => unauthorized(),
        Ok(Err(e)) => {
            tracing::error!("session lookup failed: {e}");
            internal_error()
        }
        Err(e) => {
            tracing::error!("session lookup task failed: {e}");
            internal_error()
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn session_token(req: &Request) -> Option<String> {
    let headers = req.headers();
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        let bearer = bearer.trim();
        if !bearer.is_empty() {
            return Some(bearer.to_string());
        }
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|part| {
            part.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
}

fn unauthorized() -> Response {
    Response::builder()
        .status(401)
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"error":"Unauthorized"}"#))
        .expect("infallible: all header values are valid ASCII")
}

fn internal_error() -> Response {
    Response::builder()
        .status(500)
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"error":"Internal server error"}"#))
        .expect("infallible: all header values are valid ASCII")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{middleware, routing::get, Extension, Router};
    use saturn_core::account::{create_user, issue_session};
    use saturn_core::config::Config;
    use saturn_core::store::Store;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn whoami(Extension(CurrentUser(user)): Extension<CurrentUser>) -> String {
        user.email
    }

    fn test_app() -> (TempDir, Router, String) {
        let dir = TempDir::new().unwrap();
        let store = Store::open_in(dir.path()).unwrap();
        let now = chrono::Utc::now();
        let token = store
            .write(|tx| {
                let user = create_user(tx, "ada@example.com", None, now)?;
                issue_session(tx, &user.id, chrono::Duration::days(1), now)
            })
            .unwrap();
        let state = AppState::new(store, Config::default());
        let app = Router::new()
            .route("/api/me", get(whoami))
            .layer(middleware::from_fn_with_state(state, require_session));
        (dir, app, token)
    }

    fn request(header: Option<(&str, String)>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/api/me");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let (_dir, app, _) = test_app();
        let resp = app.oneshot(request(None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bearer_token_passes() {
        let (_dir, app, token) = test_app();
        let resp = app
            .oneshot(request(Some(("authorization", format!("Bearer {token}")))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn session_cookie_passes() {
        let (_dir, app, token) = test_app();
        let resp = app
            .oneshot(request(Some((
                "cookie",
                format!("theme=dark; {SESSION_COOKIE}={token}"),
            ))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_token_is_401() {
        let (_dir, app, _) = test_app();
        let resp = app
            .oneshot(request(Some(("authorization", "Bearer ss_nope".to_string()))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn cookie_prefix_must_match_exactly() {
        let req = axum::http::Request::builder()
            .header("cookie", "saturn_session_old=abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(session_token(&req), None);
    }
}
