use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use saturn_core::account::require_membership;
use saturn_core::maintenance::{self, NewWindow};
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

/// GET /api/maintenance-windows?orgId=
pub async fn list_windows(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<OrgQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        store.read(|tx| {
            require_membership(tx, &user.id, &query.org_id)?;
            let now = chrono::Utc::now();
            let windows: Vec<serde_json::Value> = maintenance::list_windows(tx, &query.org_id)?
                .into_iter()
                .map(|w| {
                    let active = w.contains(now);
                    let mut v = serde_json::json!(w);
                    v["active"] = serde_json::json!(active);
                    v
                })
                .collect();
            Ok(serde_json::json!({ "windows": windows }))
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// POST /api/maintenance-windows
pub async fn create_window(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ValidatedJson(input): ValidatedJson<NewWindow>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let store = app.store.clone();
    let window = tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            require_membership(tx, &user.id, &input.org_id)?;
            maintenance::create_window(tx, input, chrono::Utc::now())
        })
    })
    .await
    .map_err(AppError::join)??;

    tracing::info!(window = %window.id, "maintenance window created");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "window": window })),
    ))
}

/// DELETE /api/maintenance-windows/{id}
pub async fn delete_window(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let deleted = tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            let window = maintenance::get_window(tx, &id)?;
            require_membership(tx, &user.id, &window.org_id)?;
            maintenance::delete_window(tx, &id)
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(serde_json::json!({ "deleted": deleted.id })))
}
