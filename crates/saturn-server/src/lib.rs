pub mod alerts;
pub mod auth;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use saturn_core::evaluator::{evaluate, EvaluationReport};
use saturn_core::webhook::WebhookEvent;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        // Account
        .route("/api/auth/logout", post(routes::account::logout))
        .route("/api/user/profile", patch(routes::account::update_profile))
        .route(
            "/api/onboarding/complete-checklist",
            post(routes::account::complete_checklist),
        )
        // Monitors
        .route(
            "/api/monitors",
            get(routes::monitors::list_monitors).post(routes::monitors::create_monitor),
        )
        .route(
            "/api/monitors/{id}",
            get(routes::monitors::get_monitor)
                .patch(routes::monitors::update_monitor)
                .delete(routes::monitors::delete_monitor),
        )
        .route("/api/monitors/{id}/runs", get(routes::monitors::list_runs))
        // Incidents
        .route("/api/incidents", get(routes::incidents::list_incidents))
        .route("/api/incidents/{id}", get(routes::incidents::get_incident))
        .route(
            "/api/incidents/{id}/ack",
            post(routes::incidents::acknowledge),
        )
        .route(
            "/api/incidents/{id}/resolve",
            post(routes::incidents::resolve),
        )
        .route(
            "/api/incidents/{id}/snooze",
            post(routes::incidents::snooze).delete(routes::incidents::unsnooze),
        )
        // Maintenance windows
        .route(
            "/api/maintenance-windows",
            get(routes::maintenance::list_windows).post(routes::maintenance::create_window),
        )
        .route(
            "/api/maintenance-windows/{id}",
            axum::routing::delete(routes::maintenance::delete_window),
        )
        // Alert channels
        .route(
            "/api/channels",
            get(routes::channels::list_channels).post(routes::channels::create_channel),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/robots.txt", get(routes::robots::robots_txt))
        .route("/api/health", get(routes::health::health))
        .route(
            "/api/ping/{token}",
            get(routes::ping::ping).post(routes::ping::ping),
        )
        .route(
            "/api/auth/mfa-verified",
            post(routes::account::mfa_verified),
        )
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Run one evaluator pass and announce the incidents it opened.
pub async fn run_evaluation(app: &AppState) -> anyhow::Result<EvaluationReport> {
    let store = app.store.clone();
    let mut report = tokio::task::spawn_blocking(move || {
        store.write(|tx| evaluate(tx, chrono::Utc::now()))
    })
    .await??;

    let alerts = std::mem::take(&mut report.alerts);
    alerts::dispatch(app, WebhookEvent::Opened, alerts).await;
    Ok(report)
}

/// Run [`run_evaluation`] every `evaluator.interval_secs` until the task is
/// dropped.
pub fn spawn_evaluator(app: AppState) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs(app.config.evaluator.interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match run_evaluation(&app).await {
                Ok(report) => tracing::debug!(
                    checked = report.checked,
                    missed = report.missed.len(),
                    "evaluator tick"
                ),
                Err(e) => tracing::error!("evaluator tick failed: {e:#}"),
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Serving
// ---------------------------------------------------------------------------

/// Start the Saturn API server with the background evaluator.
pub async fn serve(app_state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(app_state, listener).await
}

/// Start the server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    for warning in app_state.config.validate() {
        tracing::warn!("config: {}", warning.message);
    }

    let evaluator = spawn_evaluator(app_state.clone());
    let app = build_router(app_state);

    tracing::info!("Saturn API listening on http://localhost:{actual_port}");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await;
    evaluator.abort();
    result?;
    Ok(())
}
