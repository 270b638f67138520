use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use saturn_core::account::require_membership;
use saturn_core::incident::{self, IncidentAlert, IncidentFilter, SnoozeRequest, Transition};
use saturn_core::monitor::get_monitor;
use saturn_core::store::WriteTx;
use saturn_core::types::{IncidentKind, IncidentStatus};
use saturn_core::webhook::WebhookEvent;
use serde::Deserialize;

use crate::alerts::spawn_dispatch;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub org_id: String,
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    #[serde(default)]
    pub kind: Option<IncidentKind>,
    #[serde(default)]
    pub monitor_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/incidents?orgId=&status=&kind=&monitorId=&limit=
pub async fn list_incidents(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        store.read(|tx| {
            require_membership(tx, &user.id, &query.org_id)?;
            let filter = IncidentFilter {
                status: query.status,
                kind: query.kind,
                monitor_id: query.monitor_id.clone(),
                limit: query.limit,
            };
            let incidents = incident::list_incidents(tx, &query.org_id, &filter)?;
            Ok(serde_json::json!({ "incidents": incidents }))
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// GET /api/incidents/{id}: incident with its event timeline.
pub async fn get_incident(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        store.read(|tx| {
            let inc = incident::get_incident(tx, &id)?;
            require_membership(tx, &user.id, &inc.org_id)?;
            let events = incident::list_events(tx, &id)?;
            Ok(serde_json::json!({ "incident": inc, "events": events }))
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// Load the incident, check membership, then apply `change`. Returns the
/// transition with its monitor for notification.
fn transition(
    tx: &WriteTx,
    id: &str,
    user_id: &str,
    change: impl FnOnce(&WriteTx) -> saturn_core::Result<Transition>,
) -> saturn_core::Result<(Transition, IncidentAlert)> {
    let current = incident::get_incident(tx, id)?;
    require_membership(tx, user_id, &current.org_id)?;
    let t = change(tx)?;
    let alert = IncidentAlert {
        monitor: get_monitor(tx, &t.incident.monitor_id)?,
        incident: t.incident.clone(),
    };
    Ok((t, alert))
}

/// POST /api/incidents/{id}/ack
pub async fn acknowledge(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let (t, alert) = tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            transition(tx, &id, &user.id, |tx| {
                incident::acknowledge(tx, &id, &user.id, chrono::Utc::now())
            })
        })
    })
    .await
    .map_err(AppError::join)??;

    if t.changed {
        tracing::info!(incident = %t.incident.id, "incident acknowledged");
        spawn_dispatch(&app, WebhookEvent::Acknowledged, vec![alert]);
    }
    Ok(Json(serde_json::json!({
        "success": true,
        "changed": t.changed,
        "incident": t.incident,
    })))
}

/// POST /api/incidents/{id}/resolve
pub async fn resolve(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let (t, alert) = tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            transition(tx, &id, &user.id, |tx| {
                incident::resolve(tx, &id, Some(&user.id), chrono::Utc::now())
            })
        })
    })
    .await
    .map_err(AppError::join)??;

    if t.changed {
        tracing::info!(incident = %t.incident.id, "incident resolved");
        spawn_dispatch(&app, WebhookEvent::Resolved, vec![alert]);
    }
    Ok(Json(serde_json::json!({
        "success": true,
        "changed": t.changed,
        "incident": t.incident,
    })))
}

/// POST /api/incidents/{id}/snooze: body `{minutes}` or `{until}`.
pub async fn snooze(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<SnoozeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let updated = tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            let current = incident::get_incident(tx, &id)?;
            require_membership(tx, &user.id, &current.org_id)?;
            incident::snooze(tx, &id, &body, &user.id, chrono::Utc::now())
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(serde_json::json!({
        "success": true,
        "suppressUntil": updated.suppress_until,
        "incident": updated,
    })))
}

/// DELETE /api/incidents/{id}/snooze
pub async fn unsnooze(
    State(app): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let updated = tokio::task::spawn_blocking(move || {
        store.write(|tx| {
            let current = incident::get_incident(tx, &id)?;
            require_membership(tx, &user.id, &current.org_id)?;
            incident::unsnooze(tx, &id, &user.id, chrono::Utc::now())
        })
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(serde_json::json!({ "success": true, "incident": updated })))
}
