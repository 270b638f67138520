use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use saturn_core::account::require_membership;
use saturn_core::monitor::{self, MonitorFilter, NewMonitor};
use saturn_core::schedule::format_schedule;
use saturn_core::types::MonitorStatus;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::state::AppState;

const DEFAULT_RUN_LIMIT: usize = 50;
const MAX_RUN_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub org_id: String,
    #[serde(default)]
    pub status: Option<MonitorStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/monitors?orgId=&status=&limit=
pub async fn list_monitors(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        store.read(|tx| {
            require_membership(tx, &user.id, &query.org_id)?;
            let filter = MonitorFilter {
                status: query.status,
                limit: query.limit,
            };
            let list: Vec<serde_json::Value> = monitor::list_monitors(tx, &query.org_id, &filter)?
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "id": m.id,
                        "name": m.name,
                        "status": m.status,
                        "schedule": format_schedule(&m.schedule),
                        "nextDueAt": m.next_due_at,
                        "lastRunAt": m.last_run_at,
                        "lastDurationMs": m.last_duration_ms,
                        "lastExitCode": m.last_exit_code,
                        "tags": m.tags,
                    })
                })
                .collect();
            Ok(serde_json::json!({ "monitors": list }))
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// POST /api/monitors
pub async fn create_monitor(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ValidatedJson(input): ValidatedJson<NewMonitor>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let store = app.store.clone();
    let created = tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            require_membership(tx, &user.id, &input.org_id)?;
            monitor::create_monitor(tx, input, chrono::Utc::now())
        })
    })
    .await
    .map_err(AppError::join)??;

    tracing::info!(monitor = %created.id, "monitor created");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "monitor": created })),
    ))
}

/// GET /api/monitors/{id}: monitor detail with health score.
pub async fn get_monitor(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        store.read(|tx| {
            let m = monitor::get_monitor(tx, &id)?;
            require_membership(tx, &user.id, &m.org_id)?;
            let health = monitor::monitor_health(tx, &m, chrono::Utc::now())?;
            let open_incidents = saturn_core::incident::active_incidents(tx, &m.id)?;
            Ok(serde_json::json!({
                "monitor": m,
                "health": health,
                "openIncidents": open_incidents,
            }))
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct MonitorUpdate {
    pub enabled: bool,
}

/// PATCH /api/monitors/{id}: body `{enabled}`.
pub async fn update_monitor(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<MonitorUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let updated = tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            let m = monitor::get_monitor(tx, &id)?;
            require_membership(tx, &user.id, &m.org_id)?;
            monitor::set_enabled(tx, &id, body.enabled, chrono::Utc::now())
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(serde_json::json!({ "monitor": updated })))
}

/// DELETE /api/monitors/{id}
pub async fn delete_monitor(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let deleted = tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            let m = monitor::get_monitor(tx, &id)?;
            require_membership(tx, &user.id, &m.org_id)?;
            monitor::delete_monitor(tx, &id)
        })
    })
    .await
    .map_err(AppError::join)??;

    tracing::info!(monitor = %deleted.id, "monitor deleted");
    Ok(Json(serde_json::json!({ "deleted": deleted.id })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RunsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/monitors/{id}/runs?limit=
pub async fn list_runs(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_RUN_LIMIT).min(MAX_RUN_LIMIT);
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        store.read(|tx| {
            let m = monitor::get_monitor(tx, &id)?;
            require_membership(tx, &user.id, &m.org_id)?;
            let runs = monitor::list_runs(tx, &id, limit)?;
            Ok(serde_json::json!({ "runs": runs }))
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}
