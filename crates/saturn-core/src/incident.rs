//! Incident lifecycle: open, acknowledge, resolve, snooze.
//!
//! ```text
//! OPEN --ack--> ACKED --resolve--> RESOLVED
//!   \______________resolve______________/
//! ```
//! Acknowledging or resolving an incident already in the target state is a
//! no-op. Acknowledging a resolved incident is an invalid transition.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SaturnError};
use crate::monitor::{get_monitor, Monitor};
use crate::store::{child_key, child_prefix, index_key, resolve_index, Reader, Table, WriteTx};
use crate::types::{IncidentKind, IncidentStatus, Severity};

pub const MAX_SNOOZE_MINUTES: i64 = 10_080;
/// Upstream incidents older than this no longer suppress downstream alerts.
pub const CASCADE_LOOKBACK_MINUTES: i64 = 60;
pub const SUPPRESSED_PREFIX: &str = "[SUPPRESSED]";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub monitor_id: String,
    pub org_id: String,
    pub kind: IncidentKind,
    pub status: IncidentStatus,
    pub severity: Severity,
    pub summary: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub dedupe_hash: Option<String>,
    /// Opened while a required upstream monitor was failing.
    #[serde(default)]
    pub suppressed: bool,
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolved_by: Option<String>,
    #[serde(default)]
    pub suppress_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_alerted_at: Option<DateTime<Utc>>,
}

impl Incident {
    pub fn is_snoozed(&self, now: DateTime<Utc>) -> bool {
        self.suppress_until.is_some_and(|until| until > now)
    }

    /// Whether a notification should go out for this incident at `now`.
    pub fn needs_alert(&self, now: DateTime<Utc>, min_gap: Duration) -> bool {
        if self.suppressed || self.is_snoozed(now) {
            return false;
        }
        match self.last_alerted_at {
            Some(last) => now - last >= min_gap,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentEvent {
    pub id: Uuid,
    pub incident_id: String,
    pub event_type: String,
    pub message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub at: DateTime<Utc>,
}

/// A freshly opened incident that should be announced, with its monitor.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentAlert {
    pub monitor: Monitor,
    pub incident: Incident,
}

/// Result of a state change request; `changed` is false for no-ops.
#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub incident: Incident,
    pub changed: bool,
}

fn record_event(
    tx: &WriteTx,
    incident_id: &str,
    event_type: &str,
    message: String,
    user_id: Option<&str>,
    at: DateTime<Utc>,
) -> Result<()> {
    let event = IncidentEvent {
        id: Uuid::new_v4(),
        incident_id: incident_id.to_string(),
        event_type: event_type.to_string(),
        message,
        user_id: user_id.map(str::to_string),
        at,
    };
    tx.put(
        Table::IncidentEvents,
        &child_key(incident_id, at, event.id),
        &event,
    )
}

fn save(tx: &WriteTx, incident: &Incident) -> Result<()> {
    tx.put(Table::Incidents, &incident.id, incident)
}

fn monitor_key(incident: &Incident) -> String {
    child_key(&incident.monitor_id, incident.opened_at, &incident.id)
}

fn org_key(incident: &Incident) -> String {
    child_key(&incident.org_id, incident.opened_at, &incident.id)
}

fn active_key(incident: &Incident) -> String {
    index_key(&incident.monitor_id, &incident.id)
}

// ---------------------------------------------------------------------------
// Opening
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewIncident {
    pub kind: IncidentKind,
    pub severity: Severity,
    pub summary: String,
    pub details: Option<String>,
    pub dedupe_hash: Option<String>,
}

/// Open an incident for `monitor`, cascade-suppressing it when a required
/// upstream monitor is already failing.
pub fn open_incident(
    tx: &WriteTx,
    monitor: &Monitor,
    new: NewIncident,
    now: DateTime<Utc>,
) -> Result<Incident> {
    let mut incident = Incident {
        id: Uuid::new_v4().to_string(),
        monitor_id: monitor.id.clone(),
        org_id: monitor.org_id.clone(),
        kind: new.kind,
        status: IncidentStatus::Open,
        severity: new.severity,
        summary: new.summary,
        details: new.details,
        dedupe_hash: new.dedupe_hash,
        suppressed: false,
        opened_at: now,
        acknowledged_at: None,
        acknowledged_by: None,
        resolved_at: None,
        resolved_by: None,
        suppress_until: None,
        last_alerted_at: None,
    };

    if new.kind != IncidentKind::Anomaly {
        if let Some((upstream, upstream_incident)) = failing_upstream(tx, monitor, now)? {
            let reason = format!(
                "Suppressed due to upstream dependency failure: {} ({})",
                upstream.name, upstream_incident.kind
            );
            incident.details = Some(
                serde_json::json!({
                    "suppressed": true,
                    "reason": reason,
                    "upstreamIncidentId": upstream_incident.id,
                    "originalSummary": incident.summary,
                })
                .to_string(),
            );
            incident.summary = format!("{SUPPRESSED_PREFIX} {reason}");
            incident.severity = Severity::Low;
            incident.suppressed = true;
            incident.suppress_until = Some(now + Duration::hours(24));
            tracing::info!(
                monitor = %monitor.id,
                upstream = %upstream.id,
                "incident suppressed by upstream failure"
            );
        }
    }

    save(tx, &incident)?;
    tx.put(Table::MonitorIncidents, &monitor_key(&incident), &incident.id)?;
    tx.put(Table::OrgIncidents, &org_key(&incident), &incident.id)?;
    tx.put(Table::ActiveIncidents, &active_key(&incident), &incident.id)?;
    record_event(
        tx,
        &incident.id,
        "OPENED",
        incident.summary.clone(),
        None,
        now,
    )?;
    Ok(incident)
}

/// A required upstream monitor with a recent active FAIL/MISSED/LATE incident.
fn failing_upstream(
    tx: &impl Reader,
    monitor: &Monitor,
    now: DateTime<Utc>,
) -> Result<Option<(Monitor, Incident)>> {
    let cutoff = now - Duration::minutes(CASCADE_LOOKBACK_MINUTES);
    for upstream_id in &monitor.depends_on {
        let upstream = match get_monitor(tx, upstream_id) {
            Ok(m) => m,
            Err(SaturnError::MonitorNotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        let latest = active_incidents(tx, upstream_id)?
            .into_iter()
            .filter(|i| i.kind != IncidentKind::Anomaly && i.opened_at >= cutoff)
            .max_by_key(|i| i.opened_at);
        if let Some(incident) = latest {
            return Ok(Some((upstream, incident)));
        }
    }
    Ok(None)
}

/// Refresh the summary of a recent active incident instead of opening a new one.
pub(crate) fn refresh_incident(
    tx: &WriteTx,
    incident: &mut Incident,
    summary: String,
    details: Option<String>,
    now: DateTime<Utc>,
) -> Result<()> {
    incident.summary = summary;
    incident.details = details;
    save(tx, incident)?;
    record_event(tx, &incident.id, "UPDATED", incident.summary.clone(), None, now)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn get_incident(tx: &impl Reader, id: &str) -> Result<Incident> {
    tx.get(Table::Incidents, id)?
        .ok_or_else(|| SaturnError::IncidentNotFound(id.to_string()))
}

/// Every incident ever opened for a monitor, oldest first.
pub fn incidents_for_monitor(tx: &impl Reader, monitor_id: &str) -> Result<Vec<Incident>> {
    resolve_index(
        tx,
        Table::MonitorIncidents,
        &child_prefix(monitor_id),
        Table::Incidents,
    )
}

/// OPEN and ACKED incidents of a monitor.
pub fn active_incidents(tx: &impl Reader, monitor_id: &str) -> Result<Vec<Incident>> {
    let incidents: Vec<Incident> = resolve_index(
        tx,
        Table::ActiveIncidents,
        &child_prefix(monitor_id),
        Table::Incidents,
    )?;
    Ok(incidents
        .into_iter()
        .filter(|i| i.status.is_active())
        .collect())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentFilter {
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    #[serde(default)]
    pub kind: Option<IncidentKind>,
    #[serde(default)]
    pub monitor_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Incidents of an org, newest first.
pub fn list_incidents(tx: &impl Reader, org_id: &str, filter: &IncidentFilter) -> Result<Vec<Incident>> {
    let ids: Vec<String> = match &filter.monitor_id {
        Some(monitor_id) => {
            tx.scan_rev(Table::MonitorIncidents, &child_prefix(monitor_id), usize::MAX)?
        }
        None => tx.scan_rev(Table::OrgIncidents, &child_prefix(org_id), usize::MAX)?,
    };
    let limit = filter.limit.unwrap_or(usize::MAX);

    let mut incidents = Vec::new();
    for id in ids {
        if incidents.len() >= limit {
            break;
        }
        let Some(incident) = tx.get::<Incident>(Table::Incidents, &id)? else {
            continue;
        };
        if incident.org_id == org_id
            && filter.status.map_or(true, |s| incident.status == s)
            && filter.kind.map_or(true, |k| incident.kind == k)
        {
            incidents.push(incident);
        }
    }
    Ok(incidents)
}

/// Timeline of an incident, oldest first.
pub fn list_events(tx: &impl Reader, incident_id: &str) -> Result<Vec<IncidentEvent>> {
    tx.scan(Table::IncidentEvents, &child_prefix(incident_id))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

pub fn acknowledge(tx: &WriteTx, id: &str, user_id: &str, now: DateTime<Utc>) -> Result<Transition> {
    let mut incident = get_incident(tx, id)?;
    match incident.status {
        IncidentStatus::Acked => Ok(Transition {
            incident,
            changed: false,
        }),
        IncidentStatus::Resolved => Err(SaturnError::InvalidTransition {
            id: id.to_string(),
            from: IncidentStatus::Resolved.to_string(),
            to: IncidentStatus::Acked.to_string(),
        }),
        IncidentStatus::Open => {
            incident.status = IncidentStatus::Acked;
            incident.acknowledged_at = Some(now);
            incident.acknowledged_by = Some(user_id.to_string());
            save(tx, &incident)?;
            record_event(
                tx,
                id,
                "ACKNOWLEDGED",
                "Incident acknowledged".to_string(),
                Some(user_id),
                now,
            )?;
            Ok(Transition {
                incident,
                changed: true,
            })
        }
    }
}

/// Resolve an incident. `user_id` is `None` when a healthy run closes it.
pub fn resolve(
    tx: &WriteTx,
    id: &str,
    user_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Transition> {
    let mut incident = get_incident(tx, id)?;
    if incident.status == IncidentStatus::Resolved {
        return Ok(Transition {
            incident,
            changed: false,
        });
    }
    incident.status = IncidentStatus::Resolved;
    incident.resolved_at = Some(now);
    incident.resolved_by = user_id.map(str::to_string);
    save(tx, &incident)?;
    tx.remove(Table::ActiveIncidents, &active_key(&incident))?;
    let message = match user_id {
        Some(_) => "Incident resolved".to_string(),
        None => "Resolved automatically by a successful run".to_string(),
    };
    record_event(tx, id, "RESOLVED", message, user_id, now)?;
    Ok(Transition {
        incident,
        changed: true,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnoozeRequest {
    #[serde(default)]
    pub minutes: Option<i64>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

pub fn snooze(
    tx: &WriteTx,
    id: &str,
    request: &SnoozeRequest,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Incident> {
    let until = match (request.until, request.minutes) {
        (Some(until), _) => {
            if until <= now {
                return Err(SaturnError::invalid("until", "Until date must be in the future"));
            }
            until
        }
        (None, Some(minutes)) => {
            if !(1..=MAX_SNOOZE_MINUTES).contains(&minutes) {
                return Err(SaturnError::invalid(
                    "minutes",
                    "Minutes must be between 1 and 10080 (1 week)",
                ));
            }
            now + Duration::minutes(minutes)
        }
        (None, None) => {
            return Err(SaturnError::invalid(
                "minutes",
                "Either minutes or until is required",
            ))
        }
    };

    let mut incident = get_incident(tx, id)?;
    incident.suppress_until = Some(until);
    save(tx, &incident)?;
    record_event(
        tx,
        id,
        "SNOOZED",
        format!("Incident snoozed until {}", until.to_rfc3339()),
        Some(user_id),
        now,
    )?;
    Ok(incident)
}

pub fn unsnooze(tx: &WriteTx, id: &str, user_id: &str, now: DateTime<Utc>) -> Result<Incident> {
    let mut incident = get_incident(tx, id)?;
    incident.suppress_until = None;
    save(tx, &incident)?;
    record_event(
        tx,
        id,
        "UNSNOOZED",
        "Incident unsnoozed".to_string(),
        Some(user_id),
        now,
    )?;
    Ok(incident)
}

/// Record that a notification went out.
pub fn mark_alerted(tx: &WriteTx, id: &str, channels: usize, now: DateTime<Utc>) -> Result<Incident> {
    let mut incident = get_incident(tx, id)?;
    incident.last_alerted_at = Some(now);
    save(tx, &incident)?;
    record_event(
        tx,
        id,
        "ALERTED",
        format!("Alert delivered to {channels} channel(s)"),
        None,
        now,
    )?;
    Ok(incident)
}

/// Remove every incident of `monitor` with its events and index entries.
pub(crate) fn delete_for_monitor(tx: &WriteTx, monitor: &Monitor) -> Result<usize> {
    let incidents = incidents_for_monitor(tx, &monitor.id)?;
    for incident in &incidents {
        tx.remove_prefix(Table::IncidentEvents, &child_prefix(&incident.id))?;
        tx.remove(Table::OrgIncidents, &org_key(incident))?;
        tx.remove(Table::Incidents, &incident.id)?;
    }
    tx.remove_prefix(Table::MonitorIncidents, &child_prefix(&monitor.id))?;
    tx.remove_prefix(Table::ActiveIncidents, &child_prefix(&monitor.id))?;
    Ok(incidents.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::create_org;
    use crate::monitor::{create_monitor, tests::new_monitor};
    use crate::store::Store;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Store,
        monitor: Monitor,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Store::open_in(dir.path()).unwrap();
        let now = Utc::now();
        let monitor = store
            .write(|tx| {
                let org = create_org(tx, "Acme", 10, now)?;
                create_monitor(tx, new_monitor(&org.id, "etl", 60), now)
            })
            .unwrap();
        Fixture {
            _dir: dir,
            store,
            monitor,
        }
    }

    fn fail(summary: &str) -> NewIncident {
        NewIncident {
            kind: IncidentKind::Fail,
            severity: Severity::High,
            summary: summary.to_string(),
            details: None,
            dedupe_hash: None,
        }
    }

    fn open(f: &Fixture, monitor: &Monitor) -> Incident {
        f.store
            .write(|tx| open_incident(tx, monitor, fail("boom"), Utc::now()))
            .unwrap()
    }

    #[test]
    fn ack_then_resolve() {
        let f = fixture();
        let inc = open(&f, &f.monitor);
        let now = Utc::now();

        let t = f.store.write(|tx| acknowledge(tx, &inc.id, "u1", now)).unwrap();
        assert!(t.changed);
        assert_eq!(t.incident.status, IncidentStatus::Acked);
        assert_eq!(t.incident.acknowledged_by.as_deref(), Some("u1"));

        let again = f.store.write(|tx| acknowledge(tx, &inc.id, "u1", now)).unwrap();
        assert!(!again.changed);

        let t = f.store.write(|tx| resolve(tx, &inc.id, Some("u1"), now)).unwrap();
        assert!(t.changed);
        assert_eq!(t.incident.status, IncidentStatus::Resolved);

        let again = f.store.write(|tx| resolve(tx, &inc.id, Some("u1"), now)).unwrap();
        assert!(!again.changed);

        let events = f.store.read(|tx| list_events(tx, &inc.id)).unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["OPENED", "ACKNOWLEDGED", "RESOLVED"]);
    }

    #[test]
    fn ack_after_resolve_is_rejected() {
        let f = fixture();
        let inc = open(&f, &f.monitor);
        let now = Utc::now();
        f.store.write(|tx| resolve(tx, &inc.id, None, now)).unwrap();
        let err = f
            .store
            .write(|tx| acknowledge(tx, &inc.id, "u1", now))
            .unwrap_err();
        assert!(matches!(err, SaturnError::InvalidTransition { .. }));
    }

    #[test]
    fn unknown_incident_is_not_found() {
        let f = fixture();
        let err = f
            .store
            .write(|tx| acknowledge(tx, "missing", "u1", Utc::now()))
            .unwrap_err();
        assert!(matches!(err, SaturnError::IncidentNotFound(_)));
    }

    #[test]
    fn snooze_bounds() {
        let f = fixture();
        let inc = open(&f, &f.monitor);
        let now = Utc::now();

        for minutes in [0, MAX_SNOOZE_MINUTES + 1] {
            let req = SnoozeRequest {
                minutes: Some(minutes),
                until: None,
            };
            assert!(f.store.write(|tx| snooze(tx, &inc.id, &req, "u1", now)).is_err());
        }
        let past = SnoozeRequest {
            minutes: None,
            until: Some(now - Duration::minutes(1)),
        };
        assert!(f.store.write(|tx| snooze(tx, &inc.id, &past, "u1", now)).is_err());
        assert!(f
            .store
            .write(|tx| snooze(tx, &inc.id, &SnoozeRequest::default(), "u1", now))
            .is_err());

        let req = SnoozeRequest {
            minutes: Some(30),
            until: None,
        };
        let snoozed = f.store.write(|tx| snooze(tx, &inc.id, &req, "u1", now)).unwrap();
        assert_eq!(snoozed.suppress_until, Some(now + Duration::minutes(30)));
        assert!(snoozed.is_snoozed(now));
        assert!(!snoozed.needs_alert(now, Duration::seconds(300)));

        let cleared = f.store.write(|tx| unsnooze(tx, &inc.id, "u1", now)).unwrap();
        assert!(cleared.suppress_until.is_none());
        assert!(cleared.needs_alert(now, Duration::seconds(300)));
    }

    #[test]
    fn alert_gap_is_respected() {
        let f = fixture();
        let inc = open(&f, &f.monitor);
        let now = Utc::now();
        let alerted = f.store.write(|tx| mark_alerted(tx, &inc.id, 1, now)).unwrap();
        let gap = Duration::seconds(300);
        assert!(!alerted.needs_alert(now + Duration::seconds(10), gap));
        assert!(alerted.needs_alert(now + Duration::seconds(301), gap));
    }

    #[test]
    fn failing_upstream_suppresses_downstream() {
        let f = fixture();
        let now = Utc::now();
        let downstream = f
            .store
            .write(|tx| {
                let mut input = new_monitor(&f.monitor.org_id, "report", 60);
                input.depends_on = vec![f.monitor.id.clone()];
                create_monitor(tx, input, now)
            })
            .unwrap();

        let clean = open(&f, &downstream);
        assert!(!clean.suppressed);

        open(&f, &f.monitor);
        let suppressed = open(&f, &downstream);
        assert!(suppressed.suppressed);
        assert_eq!(suppressed.severity, Severity::Low);
        assert!(suppressed.summary.starts_with("[SUPPRESSED]"));
        assert!(suppressed.summary.contains("etl (FAIL)"));
        assert!(!suppressed.needs_alert(now, Duration::seconds(0)));
    }

    #[test]
    fn list_filters_and_orders() {
        let f = fixture();
        let first = open(&f, &f.monitor);
        let second = f
            .store
            .write(|tx| {
                open_incident(
                    tx,
                    &f.monitor,
                    NewIncident {
                        kind: IncidentKind::Missed,
                        ..fail("missed")
                    },
                    Utc::now() + Duration::seconds(5),
                )
            })
            .unwrap();

        let all = f
            .store
            .read(|tx| list_incidents(tx, &f.monitor.org_id, &IncidentFilter::default()))
            .unwrap();
        assert_eq!(all.iter().map(|i| i.id.clone()).collect::<Vec<_>>(), vec![
            second.id.clone(),
            first.id.clone()
        ]);

        let missed = f
            .store
            .read(|tx| {
                list_incidents(
                    tx,
                    &f.monitor.org_id,
                    &IncidentFilter {
                        kind: Some(IncidentKind::Missed),
                        ..Default::default()
                    },
                )
            })
            .unwrap();
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].id, second.id);
    }

    #[test]
    fn indexes_track_monitor_and_active_state() {
        let f = fixture();
        let now = Utc::now();
        let other = f
            .store
            .write(|tx| create_monitor(tx, new_monitor(&f.monitor.org_id, "sync", 60), now))
            .unwrap();

        let mine = open(&f, &f.monitor);
        let theirs = open(&f, &other);

        let (history, active) = f
            .store
            .read(|tx| {
                Ok((
                    incidents_for_monitor(tx, &f.monitor.id)?,
                    active_incidents(tx, &f.monitor.id)?,
                ))
            })
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, mine.id);
        assert_eq!(active.len(), 1);

        f.store.write(|tx| resolve(tx, &mine.id, None, now)).unwrap();
        let (history, active) = f
            .store
            .read(|tx| {
                Ok((
                    incidents_for_monitor(tx, &f.monitor.id)?,
                    active_incidents(tx, &f.monitor.id)?,
                ))
            })
            .unwrap();
        assert_eq!(history.len(), 1);
        assert!(active.is_empty());

        let filtered = f
            .store
            .read(|tx| {
                list_incidents(
                    tx,
                    &f.monitor.org_id,
                    &IncidentFilter {
                        monitor_id: Some(other.id.clone()),
                        ..Default::default()
                    },
                )
            })
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, theirs.id);
    }

    #[test]
    fn deleting_monitor_drops_its_incidents_and_index_entries() {
        let f = fixture();
        let inc = open(&f, &f.monitor);

        f.store
            .write(|tx| crate::monitor::delete_monitor(tx, &f.monitor.id))
            .unwrap();

        let org_ids: Vec<String> = f
            .store
            .read(|tx| tx.scan(Table::OrgIncidents, &child_prefix(&f.monitor.org_id)))
            .unwrap();
        assert!(org_ids.is_empty());
        let events = f.store.read(|tx| list_events(tx, &inc.id)).unwrap();
        assert!(events.is_empty());
        assert!(matches!(
            f.store.read(|tx| get_incident(tx, &inc.id)),
            Err(SaturnError::IncidentNotFound(_))
        ));
        let listed = f
            .store
            .read(|tx| list_incidents(tx, &f.monitor.org_id, &IncidentFilter::default()))
            .unwrap();
        assert!(listed.is_empty());
    }
}
