use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::{CurrentUser, SessionToken, SESSION_COOKIE};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::state::AppState;

/// Seven days, in seconds.
pub const MFA_COOKIE_MAX_AGE: u32 = 7 * 24 * 60 * 60;

/// `Set-Cookie` value marking the browser as MFA-verified.
pub fn mfa_cookie(production: bool) -> String {
    let mut cookie =
        format!("mfa-verified=true; HttpOnly; Max-Age={MFA_COOKIE_MAX_AGE}; SameSite=Lax; Path=/");
    if production {
        cookie.push_str("; Secure");
    }
    cookie
}

/// POST /api/auth/mfa-verified
pub async fn mfa_verified(State(app): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, mfa_cookie(app.config.is_production()))],
        Json(serde_json::json!({ "success": true })),
    )
        .into_response()
}

/// POST /api/auth/logout: revoke the current session and clear its cookie.
pub async fn logout(
    State(app): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<Response, AppError> {
    let store = app.store.clone();
    let revoked = tokio::task::spawn_blocking(move || {
        store.write(|tx| saturn_core::account::revoke_session(tx, &token))
    })
    .await
    .map_err(AppError::join)??;

    tracing::info!(revoked, "session logged out");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}=; Max-Age=0; Path=/"))],
        Json(serde_json::json!({ "success": true })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
}

/// PATCH /api/user/profile: body `{name}`.
pub async fn update_profile(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ValidatedJson(body): ValidatedJson<ProfileUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(name) = body.name else {
        return Err(AppError::bad_request("name", "Required"));
    };
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let updated = store.write(|tx| {
            saturn_core::account::update_profile(tx, &user.id, &name, chrono::Utc::now())
        })?;
        Ok::<_, saturn_core::SaturnError>(serde_json::json!({ "user": updated }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// POST /api/onboarding/complete-checklist
pub async fn complete_checklist(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            saturn_core::account::complete_onboarding(tx, &user.id, chrono::Utc::now())
        })
    })
    .await
    .map_err(AppError::join)??;

    tracing::info!("onboarding completed");
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Onboarding completed!",
    })))
}
