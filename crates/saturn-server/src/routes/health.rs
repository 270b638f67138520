use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/health: liveness plus a cheap store read.
pub async fn health(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let orgs = tokio::task::spawn_blocking(move || {
        store.read(|tx| Ok(saturn_core::account::list_orgs(tx)?.len()))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": app.config.environment,
        "orgs": orgs,
        "time": chrono::Utc::now(),
    })))
}
