use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use saturn_core::incident::IncidentAlert;
use saturn_core::ping::{record_ping, Ping, PingState};
use saturn_core::rate_limit::RateLimitDecision;
use saturn_core::webhook::WebhookEvent;
use serde::Deserialize;

use crate::alerts::spawn_dispatch;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingQuery {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from(decision.reset_at.timestamp()),
    );
    headers
}

/// Only `text/plain` bodies count as captured output.
fn captured_output(request_headers: &HeaderMap, body: String) -> Option<String> {
    let is_text = request_headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/plain"));
    Some(body).filter(|b| is_text && !b.is_empty())
}

/// GET|POST /api/ping/{token}?state=&durationMs=&exitCode=
///
/// A `text/plain` POST body is treated as captured job output.
pub async fn ping(
    State(app): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<PingQuery>,
    request_headers: HeaderMap,
    body: String,
) -> Result<Response, AppError> {
    let limits = &app.config.ping_rate_limit;
    let decision = app.ping_limiter.check(
        &format!("ping:{token}"),
        limits.limit,
        chrono::Duration::milliseconds(limits.window_ms as i64),
    );
    let headers = rate_limit_headers(&decision);
    if !decision.allowed {
        tracing::debug!("ping rate limited");
        return Ok((
            StatusCode::TOO_MANY_REQUESTS,
            headers,
            Json(serde_json::json!({ "error": "Rate limit exceeded" })),
        )
            .into_response());
    }

    let state: PingState = query.state.as_deref().unwrap_or("").parse()?;
    let ping = Ping {
        state,
        duration_ms: query.duration_ms,
        exit_code: query.exit_code,
        output: captured_output(&request_headers, body),
    };

    let store = app.store.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        store.write(|tx| record_ping(tx, &token, ping, chrono::Utc::now()))
    })
    .await
    .map_err(AppError::join)??;

    let resolved: Vec<IncidentAlert> = outcome
        .resolved
        .iter()
        .map(|incident| IncidentAlert {
            monitor: outcome.monitor.clone(),
            incident: incident.clone(),
        })
        .collect();
    spawn_dispatch(&app, WebhookEvent::Opened, outcome.alerts);
    spawn_dispatch(&app, WebhookEvent::Resolved, resolved);

    let body = serde_json::json!({
        "ok": true,
        "runId": outcome.run.id,
        "outcome": outcome.run.outcome,
        "status": outcome.monitor.status,
        "nextDueAt": outcome.next_due_at,
    });
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}
