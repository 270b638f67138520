//! Webhook payloads and HMAC signing. Delivery lives in the server.

use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::Sha256;

use crate::incident::Incident;
use crate::monitor::Monitor;

pub const SIGNATURE_HEADER: &str = "X-Saturn-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Saturn-Timestamp";
pub const USER_AGENT: &str = "Saturn/1.0";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEvent {
    #[serde(rename = "incident.opened")]
    Opened,
    #[serde(rename = "incident.acknowledged")]
    Acknowledged,
    #[serde(rename = "incident.resolved")]
    Resolved,
}

impl WebhookEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            WebhookEvent::Opened => "incident.opened",
            WebhookEvent::Acknowledged => "incident.acknowledged",
            WebhookEvent::Resolved => "incident.resolved",
        }
    }
}

impl std::fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn iso(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Insert `value` under `key` only when present.
fn put_opt(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(v) = value {
        map.insert(key.to_string(), v);
    }
}

pub fn build_payload(
    event: WebhookEvent,
    incident: &Incident,
    monitor: &Monitor,
    now: DateTime<Utc>,
) -> Value {
    let mut inc = Map::new();
    inc.insert("id".into(), json!(incident.id));
    inc.insert("kind".into(), json!(incident.kind));
    inc.insert("status".into(), json!(incident.status));
    inc.insert("severity".into(), json!(incident.severity));
    inc.insert("summary".into(), json!(incident.summary));
    put_opt(&mut inc, "details", incident.details.as_ref().map(|d| json!(d)));
    inc.insert("openedAt".into(), json!(iso(incident.opened_at)));
    put_opt(
        &mut inc,
        "acknowledgedAt",
        incident.acknowledged_at.map(|t| json!(iso(t))),
    );
    put_opt(&mut inc, "resolvedAt", incident.resolved_at.map(|t| json!(iso(t))));

    let spec = &monitor.schedule;
    let mut schedule = Map::new();
    schedule.insert("type".into(), json!(spec.schedule_type));
    put_opt(&mut schedule, "interval", spec.interval_sec.map(|s| json!(s)));
    put_opt(&mut schedule, "cron", spec.cron_expr.as_ref().map(|c| json!(c)));
    schedule.insert("timezone".into(), json!(spec.timezone));

    let mut mon = Map::new();
    mon.insert("id".into(), json!(monitor.id));
    mon.insert("name".into(), json!(monitor.name));
    mon.insert("status".into(), json!(monitor.status));
    mon.insert("schedule".into(), Value::Object(schedule));
    if let Some(at) = monitor.last_run_at {
        let mut last = Map::new();
        last.insert("at".into(), json!(iso(at)));
        put_opt(&mut last, "durationMs", monitor.last_duration_ms.map(|d| json!(d)));
        put_opt(&mut last, "exitCode", monitor.last_exit_code.map(|c| json!(c)));
        mon.insert("lastRun".into(), Value::Object(last));
    }

    json!({
        "event": event,
        "timestamp": iso(now),
        "incident": inc,
        "monitor": mon,
    })
}

/// Hex HMAC-SHA256 of `body` keyed by `secret`.
pub fn sign_payload(body: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
