//! Webhook delivery for incident notifications.

use std::time::Duration;

use chrono::Utc;
use saturn_core::channel::{enabled_channels, AlertChannel};
use saturn_core::config::AlertConfig;
use saturn_core::incident::{mark_alerted, IncidentAlert};
use saturn_core::webhook::{build_payload, sign_payload, WebhookEvent, SIGNATURE_HEADER, TIMESTAMP_HEADER};

use crate::state::AppState;

/// Backoff before retry number `attempt + 1`: `base * 2^(attempt - 1)`.
pub fn retry_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// POST `body` to the channel, retrying non-2xx answers and transport
/// errors. Returns whether any attempt succeeded.
pub async fn send_webhook(
    client: &reqwest::Client,
    channel: &AlertChannel,
    body: &str,
    cfg: &AlertConfig,
) -> bool {
    let attempts = cfg.retry_attempts.max(1);
    for attempt in 1..=attempts {
        let mut req = client
            .post(&channel.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        if let Some(secret) = &channel.secret {
            req = req
                .header(SIGNATURE_HEADER, sign_payload(body.as_bytes(), secret))
                .header(TIMESTAMP_HEADER, Utc::now().timestamp_millis().to_string());
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => return true,
            Ok(resp) => tracing::warn!(
                channel = %channel.id,
                "webhook attempt {attempt}/{attempts} returned {}",
                resp.status()
            ),
            Err(e) => tracing::warn!(
                channel = %channel.id,
                "webhook attempt {attempt}/{attempts} failed: {e}"
            ),
        }

        if attempt < attempts {
            tokio::time::sleep(retry_delay(cfg.retry_delay_ms, attempt)).await;
        }
    }
    false
}

/// Notify every enabled channel of the incident's org. Opened incidents go
/// through the snooze and re-alert gap checks and record `last_alerted_at`.
/// Returns the number of incidents announced on at least one channel.
pub async fn dispatch(app: &AppState, event: WebhookEvent, alerts: Vec<IncidentAlert>) -> usize {
    let gap = chrono::Duration::seconds(app.config.alerts.suppress_secs as i64);
    let mut announced = 0;

    for IncidentAlert { monitor, incident } in alerts {
        let now = Utc::now();
        let skip = match event {
            WebhookEvent::Opened => !incident.needs_alert(now, gap),
            _ => incident.suppressed,
        };
        if skip {
            tracing::debug!(incident = %incident.id, "alert skipped");
            continue;
        }

        let store = app.store.clone();
        let org_id = monitor.org_id.clone();
        let channels =
            match tokio::task::spawn_blocking(move || store.read(|tx| enabled_channels(tx, &org_id)))
                .await
            {
                Ok(Ok(channels)) => channels,
                Ok(Err(e)) => {
                    tracing::error!("loading alert channels failed: {e}");
                    continue;
                }
                Err(e) => {
                    tracing::error!("loading alert channels failed: {e}");
                    continue;
                }
            };
        if channels.is_empty() {
            continue;
        }

        let body = build_payload(event, &incident, &monitor, now).to_string();
        let mut delivered = 0;
        for channel in &channels {
            if send_webhook(&app.http_client, channel, &body, &app.config.alerts).await {
                delivered += 1;
            }
        }
        if delivered == 0 {
            tracing::warn!(incident = %incident.id, "{event} not delivered to any channel");
            continue;
        }
        announced += 1;
        tracing::info!(incident = %incident.id, channels = delivered, "{event} delivered");

        if event == WebhookEvent::Opened {
            let store = app.store.clone();
            let id = incident.id.clone();
            let marked = tokio::task::spawn_blocking(move || {
                store.write(|tx| mark_alerted(tx, &id, delivered, now))
            })
            .await;
            if !matches!(marked, Ok(Ok(_))) {
                tracing::error!(incident = %incident.id, "recording alert delivery failed");
            }
        }
    }
    announced
}

/// Fire-and-forget variant of [`dispatch`] for request handlers.
pub fn spawn_dispatch(app: &AppState, event: WebhookEvent, alerts: Vec<IncidentAlert>) {
    if alerts.is_empty() {
        return;
    }
    let app = app.clone();
    tokio::spawn(async move {
        dispatch(&app, event, alerts).await;
    });
}
