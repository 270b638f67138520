use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use saturn_core::account::require_membership;
use saturn_core::channel::{self, NewChannel};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgQuery {
    pub org_id: String,
}

/// GET /api/channels?orgId=: secrets are never returned.
pub async fn list_channels(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<OrgQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        store.read(|tx| {
            require_membership(tx, &user.id, &query.org_id)?;
            let list: Vec<serde_json::Value> = channel::list_channels(tx, &query.org_id)?
                .iter()
                .map(|c| {
                    let mut v = serde_json::json!(c.redacted());
                    v["hasSecret"] = serde_json::json!(c.has_secret());
                    v
                })
                .collect();
            Ok(serde_json::json!({ "channels": list }))
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// POST /api/channels
pub async fn create_channel(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ValidatedJson(input): ValidatedJson<NewChannel>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let store = app.store.clone();
    let created = tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            require_membership(tx, &user.id, &input.org_id)?;
            channel::create_channel(tx, input, chrono::Utc::now())
        })
    })
    .await
    .map_err(AppError::join)??;

    tracing::info!(channel = %created.id, "alert channel created");
    let mut body = serde_json::json!(created.redacted());
    body["hasSecret"] = serde_json::json!(created.has_secret());
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "channel": body }))))
}
