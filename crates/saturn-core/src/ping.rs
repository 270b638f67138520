//! Ping ingestion: turns a job's check-in into a run, a status change,
//! incidents, duration statistics and anomaly checks.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::anomaly::{detect_duration_anomaly, detect_output_size_anomaly, Anomaly, AnomalySeverity};
use crate::error::{Result, SaturnError};
use crate::incident::{
    active_incidents, open_incident, refresh_incident, resolve, Incident, IncidentAlert,
    NewIncident,
};
use crate::monitor::{list_runs, monitor_by_token, save_monitor, save_run, Monitor, Run};
use crate::redact::{redact_output, truncate_output};
use crate::schedule::{self, grace, is_run_late};
use crate::store::WriteTx;
use crate::types::{IncidentKind, MonitorStatus, RunOutcome, Severity};
use crate::welford::median;

/// Successful durations feeding the stored median.
pub const MEDIAN_WINDOW: usize = 50;
/// How many recent runs are searched for an open STARTED run or baselines.
const RECENT_RUNS: usize = 250;
/// An active anomaly incident younger than this is refreshed instead of duplicated.
const ANOMALY_REFRESH_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PingState {
    Start,
    #[default]
    Success,
    Fail,
}

impl PingState {
    pub fn as_str(self) -> &'static str {
        match self {
            PingState::Start => "start",
            PingState::Success => "success",
            PingState::Fail => "fail",
        }
    }
}

impl FromStr for PingState {
    type Err = SaturnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "start" => Ok(PingState::Start),
            "success" | "" => Ok(PingState::Success),
            "fail" => Ok(PingState::Fail),
            _ => Err(SaturnError::invalid(
                "state",
                format!("unknown ping state '{s}', expected start, success or fail"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ping {
    pub state: PingState,
    pub duration_ms: Option<u64>,
    pub exit_code: Option<i32>,
    /// Captured job output; ignored unless the monitor captures output.
    pub output: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PingOutcome {
    pub monitor: Monitor,
    pub run: Run,
    pub next_due_at: Option<DateTime<Utc>>,
    /// Newly opened incidents that should be announced.
    pub alerts: Vec<IncidentAlert>,
    /// Incidents closed by this ping.
    pub resolved: Vec<Incident>,
}

pub fn record_ping(tx: &WriteTx, token: &str, ping: Ping, now: DateTime<Utc>) -> Result<PingOutcome> {
    let mut monitor = monitor_by_token(tx, token)?;
    if monitor.is_disabled() {
        return Err(SaturnError::Forbidden("Monitor is disabled".to_string()));
    }

    if ping.state == PingState::Start {
        let run = Run::new(&monitor.id, now, RunOutcome::Started);
        save_run(tx, &run)?;
        tracing::debug!(monitor = %monitor.id, "start ping recorded");
        return Ok(PingOutcome {
            next_due_at: monitor.next_due_at,
            monitor,
            run,
            alerts: Vec::new(),
            resolved: Vec::new(),
        });
    }

    let succeeded = ping.state == PingState::Success;
    let recent = list_runs(tx, &monitor.id, RECENT_RUNS)?;
    let previous_sizes: Vec<u64> = recent.iter().filter_map(|r| r.size_bytes).collect();
    let started = recent
        .iter()
        .find(|r| r.outcome == RunOutcome::Started && r.finished_at.is_none())
        .cloned();

    let duration_ms = ping.duration_ms.or_else(|| {
        started
            .as_ref()
            .map(|r| (now - r.started_at).num_milliseconds().max(0) as u64)
    });
    let exit_code = ping.exit_code.unwrap_or(if succeeded { 0 } else { 1 });
    let late = monitor
        .next_due_at
        .is_some_and(|due| is_run_late(due, monitor.grace_sec, now));
    let outcome = match (late, succeeded) {
        (true, _) => RunOutcome::Late,
        (false, true) => RunOutcome::Success,
        (false, false) => RunOutcome::Fail,
    };

    let (output, size_bytes) = match ping.output.filter(|_| monitor.capture_output) {
        Some(raw) => {
            let size = raw.len() as u64;
            let stored = truncate_output(&redact_output(&raw), monitor.capture_limit_kb);
            (Some(stored), Some(size))
        }
        None => (None, None),
    };

    let mut run = started.unwrap_or_else(|| Run::new(&monitor.id, now, outcome));
    run.finished_at = Some(now);
    run.duration_ms = duration_ms;
    run.exit_code = Some(exit_code);
    run.outcome = outcome;
    run.output = output;
    run.size_bytes = size_bytes;
    save_run(tx, &run)?;

    let due_before = monitor.next_due_at;
    let next_due_at = schedule::next_due_at(&monitor.schedule, now)?;
    monitor.status = match (succeeded, late) {
        (true, false) => MonitorStatus::Ok,
        (true, true) => MonitorStatus::Late,
        (false, _) => MonitorStatus::Failing,
    };

    let mut resolved = Vec::new();
    if succeeded && !late {
        for incident in active_incidents(tx, &monitor.id)? {
            resolved.push(resolve(tx, &incident.id, None, now)?.incident);
        }
    }

    let mut alerts = Vec::new();
    if !succeeded || late {
        let kind = if succeeded {
            IncidentKind::Late
        } else {
            IncidentKind::Fail
        };
        let already_open = active_incidents(tx, &monitor.id)?
            .iter()
            .any(|i| i.kind == kind);
        if !already_open {
            let summary = if succeeded {
                let overdue = due_before
                    .map(|due| (now - due - grace(monitor.grace_sec)).num_seconds())
                    .unwrap_or(0);
                format!("Job completed but was late by {overdue}s")
            } else {
                format!("Job failed with exit code {exit_code}")
            };
            let incident = open_incident(
                tx,
                &monitor,
                NewIncident {
                    kind,
                    severity: if kind == IncidentKind::Fail {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                    summary,
                    details: run
                        .size_bytes
                        .map(|n| format!("Output captured for run {} ({n} bytes)", run.id)),
                    dedupe_hash: None,
                },
                now,
            )?;
            tracing::warn!(monitor = %monitor.id, kind = %kind, "incident opened");
            if !incident.suppressed {
                alerts.push(incident);
            }
        }
    }

    // Baselines for anomaly detection exclude this run.
    let prior_stats = monitor.duration_stats;
    let prior_median = monitor.duration_median;
    if succeeded {
        if let Some(d) = duration_ms.filter(|d| *d > 0) {
            monitor.duration_stats = monitor.duration_stats.update(d as f64);
            let durations: Vec<f64> = list_runs(tx, &monitor.id, RECENT_RUNS)?
                .iter()
                .filter(|r| r.outcome == RunOutcome::Success)
                .filter_map(|r| r.duration_ms)
                .take(MEDIAN_WINDOW)
                .map(|d| d as f64)
                .collect();
            if let Some(m) = median(&durations) {
                monitor.duration_median = Some(m);
            }
        }
    }

    monitor.last_run_at = Some(now);
    monitor.last_duration_ms = duration_ms;
    monitor.last_exit_code = Some(exit_code);
    monitor.next_due_at = Some(next_due_at);
    monitor.updated_at = now;
    save_monitor(tx, &monitor)?;

    if succeeded && !late {
        let mut anomalies = Vec::new();
        if let Some(d) = duration_ms.filter(|d| *d > 0) {
            anomalies.extend(detect_duration_anomaly(&prior_stats, prior_median, d as f64));
        }
        if let Some(size) = size_bytes.filter(|s| *s > 0) {
            anomalies.extend(detect_output_size_anomaly(size, &previous_sizes));
        }
        for anomaly in anomalies {
            if let Some(incident) = record_anomaly(tx, &monitor, &run, &anomaly, now)? {
                alerts.push(incident);
            }
        }
    }

    Ok(PingOutcome {
        alerts: alerts
            .into_iter()
            .map(|incident| IncidentAlert {
                monitor: monitor.clone(),
                incident,
            })
            .collect(),
        monitor,
        run,
        next_due_at: Some(next_due_at),
        resolved,
    })
}

/// Open an ANOMALY incident, or refresh one opened within the last hour.
/// Returns the incident only when it is new.
fn record_anomaly(
    tx: &WriteTx,
    monitor: &Monitor,
    run: &Run,
    anomaly: &Anomaly,
    now: DateTime<Utc>,
) -> Result<Option<Incident>> {
    let details = serde_json::json!({
        "type": anomaly.kind,
        "severity": anomaly.severity,
        "expected": anomaly.expected,
        "actual": anomaly.actual,
        "zScore": anomaly.z_score,
        "runId": run.id,
        "timestamp": now,
    })
    .to_string();

    let cutoff = now - Duration::minutes(ANOMALY_REFRESH_MINUTES);
    let recent = active_incidents(tx, &monitor.id)?
        .into_iter()
        .find(|i| i.kind == IncidentKind::Anomaly && i.opened_at >= cutoff);
    if let Some(mut incident) = recent {
        refresh_incident(tx, &mut incident, anomaly.message.clone(), Some(details), now)?;
        return Ok(None);
    }

    let incident = open_incident(
        tx,
        monitor,
        NewIncident {
            kind: IncidentKind::Anomaly,
            severity: match anomaly.severity {
                AnomalySeverity::Critical => Severity::High,
                AnomalySeverity::Warning => Severity::Medium,
            },
            summary: anomaly.message.clone(),
            details: Some(details),
            dedupe_hash: None,
        },
        now,
    )?;
    tracing::info!(monitor = %monitor.id, "anomaly detected: {}", anomaly.message);
    Ok(Some(incident))
}
