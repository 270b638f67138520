//! Missed-run detection.
//!
//! A monitor is missed once `next_due_at + grace` has passed without a
//! completed run starting at or after `next_due_at`. Each miss records a
//! MISSED run and opens at most one MISSED incident per due hour.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::incident::{active_incidents, open_incident, IncidentAlert, NewIncident};
use crate::maintenance::active_window;
use crate::monitor::{all_monitors, list_runs, save_monitor, save_run, Run};
use crate::schedule::{grace, is_run_late};
use crate::store::WriteTx;
use crate::token::sha256_hex;
use crate::types::{IncidentKind, MonitorStatus, RunOutcome, Severity};

/// Recent runs inspected for a completion after the due time.
const RECENT_RUNS: usize = 50;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    /// Monitors with a due time that were inspected.
    pub checked: usize,
    /// Ids of monitors newly marked MISSED.
    pub missed: Vec<String>,
    /// Overdue monitors skipped because a maintenance window covers them.
    pub in_maintenance: usize,
    #[serde(skip)]
    pub alerts: Vec<IncidentAlert>,
}

/// Dedupe key for a miss: one incident per monitor per due hour (UTC).
pub fn missed_dedupe_hash(monitor_id: &str, due: DateTime<Utc>) -> String {
    sha256_hex(&format!("{monitor_id}-MISSED-{}", due.format("%Y-%m-%dT%H")))
}

pub fn evaluate(tx: &WriteTx, now: DateTime<Utc>) -> Result<EvaluationReport> {
    let mut report = EvaluationReport::default();

    for mut monitor in all_monitors(tx)? {
        if matches!(monitor.status, MonitorStatus::Disabled | MonitorStatus::Missed) {
            continue;
        }
        let Some(due) = monitor.next_due_at else {
            continue;
        };
        report.checked += 1;
        if !is_run_late(due, monitor.grace_sec, now) {
            continue;
        }

        if let Some(window) = active_window(tx, &monitor.id, &monitor.org_id, now)? {
            tracing::debug!(
                monitor = %monitor.id,
                window = %window.name,
                "overdue monitor in maintenance, skipping"
            );
            report.in_maintenance += 1;
            continue;
        }

        let ran = list_runs(tx, &monitor.id, RECENT_RUNS)?
            .iter()
            .any(|r| r.outcome.is_completed() && r.started_at >= due);
        if ran {
            continue;
        }

        tracing::warn!(monitor = %monitor.id, name = %monitor.name, "monitor missed its schedule");
        monitor.status = MonitorStatus::Missed;
        monitor.updated_at = now;
        save_monitor(tx, &monitor)?;

        let mut run = Run::new(&monitor.id, due, RunOutcome::Missed);
        run.finished_at = Some(now);
        save_run(tx, &run)?;

        let dedupe = missed_dedupe_hash(&monitor.id, due);
        let duplicate = active_incidents(tx, &monitor.id)?
            .iter()
            .any(|i| i.dedupe_hash.as_deref() == Some(dedupe.as_str()));
        if !duplicate {
            let grace_end = due + grace(monitor.grace_sec);
            let missed_by = (now - grace_end).num_seconds();
            let incident = open_incident(
                tx,
                &monitor,
                NewIncident {
                    kind: IncidentKind::Missed,
                    severity: Severity::High,
                    summary: format!("Job missed by {missed_by}s"),
                    details: Some(format!(
                        "Expected to run at {}, grace period ended at {}",
                        due.to_rfc3339(),
                        grace_end.to_rfc3339()
                    )),
                    dedupe_hash: Some(dedupe),
                },
                now,
            )?;
            if !incident.suppressed {
                report.alerts.push(IncidentAlert {
                    monitor: monitor.clone(),
                    incident,
                });
            }
        }
        report.missed.push(monitor.id);
    }

    if !report.missed.is_empty() {
        tracing::info!(
            checked = report.checked,
            missed = report.missed.len(),
            "evaluation complete"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::create_org;
    use crate::incident::{list_incidents, IncidentFilter};
    use crate::maintenance::{create_window, NewWindow, Recurrence};
    use crate::monitor::{create_monitor, get_monitor, tests::new_monitor, Monitor};
    use crate::ping::{record_ping, Ping};
    use crate::store::Store;
    use chrono::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Store, Monitor, DateTime<Utc>) {
        let dir = TempDir::new().unwrap();
        let store = Store::open_in(dir.path()).unwrap();
        let t0 = Utc::now();
        let monitor = store
            .write(|tx| {
                let org = create_org(tx, "Acme", 10, t0)?;
                create_monitor(tx, new_monitor(&org.id, "hourly", 3600), t0)
            })
            .unwrap();
        (dir, store, monitor, t0)
    }

    #[test]
    fn within_grace_is_not_missed() {
        let (_dir, store, _m, t0) = setup();
        let report = store
            .write(|tx| evaluate(tx, t0 + Duration::seconds(3600 + 299)))
            .unwrap();
        assert_eq!(report.checked, 1);
        assert!(report.missed.is_empty());
    }

    #[test]
    fn overdue_monitor_is_marked_missed_once() {
        let (_dir, store, m, t0) = setup();
        let now = t0 + Duration::seconds(3600 + 300 + 30);
        let report = store.write(|tx| evaluate(tx, now)).unwrap();
        assert_eq!(report.missed, vec![m.id.clone()]);
        assert_eq!(report.alerts.len(), 1);
        let incident = &report.alerts[0].incident;
        assert_eq!(incident.kind, IncidentKind::Missed);
        assert_eq!(incident.summary, "Job missed by 30s");
        assert_eq!(
            incident.dedupe_hash.as_deref(),
            Some(missed_dedupe_hash(&m.id, m.next_due_at.unwrap()).as_str())
        );

        let stored = store.read(|tx| get_monitor(tx, &m.id)).unwrap();
        assert_eq!(stored.status, MonitorStatus::Missed);
        let runs = store.read(|tx| list_runs(tx, &m.id, 10)).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].outcome, RunOutcome::Missed);
        assert_eq!(runs[0].started_at, m.next_due_at.unwrap());

        let second = store
            .write(|tx| evaluate(tx, now + Duration::seconds(60)))
            .unwrap();
        assert!(second.missed.is_empty());
        assert_eq!(store.read(|tx| list_runs(tx, &m.id, 10)).unwrap().len(), 1);
    }

    #[test]
    fn recovery_ping_resolves_missed_incident() {
        let (_dir, store, m, t0) = setup();
        let now = t0 + Duration::seconds(4000);
        store.write(|tx| evaluate(tx, now)).unwrap();
        let out = store
            .write(|tx| record_ping(tx, &m.token, Ping::default(), now + Duration::seconds(5)))
            .unwrap();
        // The ping itself is late, so the MISSED incident stays open beside a LATE one.
        assert_eq!(out.monitor.status, MonitorStatus::Late);

        let on_time = out.next_due_at.unwrap() - Duration::seconds(10);
        let out = store
            .write(|tx| record_ping(tx, &m.token, Ping::default(), on_time))
            .unwrap();
        assert_eq!(out.monitor.status, MonitorStatus::Ok);
        assert_eq!(out.resolved.len(), 2);
        let open = store
            .read(|tx| list_incidents(tx, &m.org_id, &IncidentFilter::default()))
            .unwrap()
            .into_iter()
            .filter(|i| i.status.is_active())
            .count();
        assert_eq!(open, 0);
    }

    #[test]
    fn completed_run_after_due_prevents_miss() {
        let (_dir, store, m, t0) = setup();
        let due = m.next_due_at.unwrap();
        store
            .write(|tx| {
                let mut run = Run::new(&m.id, due + Duration::seconds(1), RunOutcome::Success);
                run.finished_at = Some(due + Duration::seconds(2));
                save_run(tx, &run)
            })
            .unwrap();
        let report = store
            .write(|tx| evaluate(tx, t0 + Duration::seconds(5000)))
            .unwrap();
        assert!(report.missed.is_empty());
    }

    #[test]
    fn maintenance_window_skips_monitor() {
        let (_dir, store, m, t0) = setup();
        let now = t0 + Duration::seconds(4000);
        store
            .write(|tx| {
                create_window(
                    tx,
                    NewWindow {
                        org_id: m.org_id.clone(),
                        monitor_id: None,
                        name: "db upgrade".into(),
                        start_time: t0 + Duration::seconds(10),
                        end_time: t0 + Duration::hours(3),
                        recurrence: Recurrence::None,
                    },
                    t0,
                )
            })
            .unwrap();
        let report = store.write(|tx| evaluate(tx, now)).unwrap();
        assert!(report.missed.is_empty());
        assert_eq!(report.in_maintenance, 1);
    }

    #[test]
    fn disabled_monitors_are_ignored() {
        let (_dir, store, m, t0) = setup();
        store
            .write(|tx| crate::monitor::set_enabled(tx, &m.id, false, t0))
            .unwrap();
        let report = store
            .write(|tx| evaluate(tx, t0 + Duration::days(1)))
            .unwrap();
        assert_eq!(report.checked, 0);
    }

    #[test]
    fn dedupe_hash_buckets_by_due_hour() {
        use chrono::TimeZone;
        let at = |h, m| Utc.with_ymd_and_hms(2024, 3, 5, h, m, 0).unwrap();
        assert_eq!(
            missed_dedupe_hash("m1", at(14, 0)),
            "d9850496c68a1870f01d12e49e5f77f7d9e8669f0f40dac3589034bde7e38611"
        );
        assert_eq!(missed_dedupe_hash("m1", at(14, 59)), missed_dedupe_hash("m1", at(14, 0)));
        assert_ne!(missed_dedupe_hash("m1", at(15, 0)), missed_dedupe_hash("m1", at(14, 0)));
        assert_ne!(missed_dedupe_hash("m2", at(14, 0)), missed_dedupe_hash("m1", at(14, 0)));
    }
}
