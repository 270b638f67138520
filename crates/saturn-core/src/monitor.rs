use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{get_org, validate_name};
use crate::error::{FieldIssue, Result, SaturnError};
use crate::health::{health_score, HealthInput, HealthScore};
use crate::schedule::{self, ScheduleSpec, MAX_GRACE_SEC};
use crate::store::{child_key, child_prefix, index_key, resolve_index, Reader, Table, WriteTx};
use crate::token::{generate_token, PING_PREFIX};
use crate::types::{MonitorStatus, RunOutcome};
use crate::welford::WelfordStats;

pub const DEFAULT_GRACE_SEC: u64 = 300;
pub const DEFAULT_CAPTURE_LIMIT_KB: u32 = 32;
pub const MAX_CAPTURE_LIMIT_KB: u32 = 1024;

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub token: String,
    pub status: MonitorStatus,
    #[serde(flatten)]
    pub schedule: ScheduleSpec,
    pub grace_sec: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub capture_output: bool,
    pub capture_limit_kb: u32,
    /// Required upstream monitors; their failures suppress this monitor's alerts.
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub next_due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_duration_ms: Option<u64>,
    #[serde(default)]
    pub last_exit_code: Option<i32>,
    #[serde(default)]
    pub duration_stats: WelfordStats,
    #[serde(default)]
    pub duration_median: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Monitor {
    pub fn is_disabled(&self) -> bool {
        self.status == MonitorStatus::Disabled
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: Uuid,
    pub monitor_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    pub outcome: RunOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

impl Run {
    pub fn new(monitor_id: &str, started_at: DateTime<Utc>, outcome: RunOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            monitor_id: monitor_id.to_string(),
            started_at,
            finished_at: None,
            duration_ms: None,
            exit_code: None,
            outcome,
            output: None,
            size_bytes: None,
        }
    }

    fn key(&self) -> String {
        child_key(&self.monitor_id, self.started_at, self.id)
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMonitor {
    pub org_id: String,
    pub name: String,
    #[serde(flatten)]
    pub schedule: ScheduleSpec,
    #[serde(default)]
    pub grace_sec: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub capture_output: bool,
    #[serde(default)]
    pub capture_limit_kb: Option<u32>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

pub fn create_monitor(tx: &WriteTx, input: NewMonitor, now: DateTime<Utc>) -> Result<Monitor> {
    let org = get_org(tx, &input.org_id)?;

    let mut issues = Vec::new();
    if let Err(SaturnError::Validation(mut found)) = validate_name("name", &input.name) {
        issues.append(&mut found);
    }
    let grace_sec = input.grace_sec.unwrap_or(DEFAULT_GRACE_SEC);
    if grace_sec > MAX_GRACE_SEC {
        issues.push(FieldIssue::new(
            "graceSec",
            format!("graceSec must be at most {MAX_GRACE_SEC}"),
        ));
    }
    let capture_limit_kb = input.capture_limit_kb.unwrap_or(DEFAULT_CAPTURE_LIMIT_KB);
    if capture_limit_kb == 0 || capture_limit_kb > MAX_CAPTURE_LIMIT_KB {
        issues.push(FieldIssue::new(
            "captureLimitKb",
            format!("captureLimitKb must be between 1 and {MAX_CAPTURE_LIMIT_KB}"),
        ));
    }
    let next_due_at = match schedule::next_due_at(&input.schedule, now) {
        Ok(t) => Some(t),
        Err(SaturnError::Validation(mut found)) => {
            issues.append(&mut found);
            None
        }
        Err(e) => return Err(e),
    };
    if !issues.is_empty() {
        return Err(SaturnError::Validation(issues));
    }

    for upstream in &input.depends_on {
        let dep = get_monitor(tx, upstream)?;
        if dep.org_id != org.id {
            return Err(SaturnError::MonitorNotFound(upstream.clone()));
        }
    }

    let existing = monitors_for_org(tx, &org.id)?.len();
    if existing as u64 >= u64::from(org.monitor_limit) {
        return Err(SaturnError::MonitorLimit(org.monitor_limit));
    }

    let monitor = Monitor {
        id: Uuid::new_v4().to_string(),
        org_id: org.id,
        name: input.name,
        token: generate_token(PING_PREFIX),
        status: MonitorStatus::Ok,
        schedule: input.schedule,
        grace_sec,
        tags: input.tags,
        capture_output: input.capture_output,
        capture_limit_kb,
        depends_on: input.depends_on,
        next_due_at,
        last_run_at: None,
        last_duration_ms: None,
        last_exit_code: None,
        duration_stats: WelfordStats::new(),
        duration_median: None,
        created_at: now,
        updated_at: now,
    };
    save_monitor(tx, &monitor)?;
    tx.put(Table::MonitorTokens, &monitor.token, &monitor.id)?;
    tx.put(Table::OrgMonitors, &index_key(&monitor.org_id, &monitor.id), &monitor.id)?;
    Ok(monitor)
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

pub fn get_monitor(tx: &impl Reader, id: &str) -> Result<Monitor> {
    tx.get(Table::Monitors, id)?
        .ok_or_else(|| SaturnError::MonitorNotFound(id.to_string()))
}

pub fn monitor_by_token(tx: &impl Reader, token: &str) -> Result<Monitor> {
    let id: String = tx
        .get(Table::MonitorTokens, token)?
        .ok_or_else(|| SaturnError::MonitorNotFound("unknown ping token".to_string()))?;
    get_monitor(tx, &id)
}

pub fn all_monitors(tx: &impl Reader) -> Result<Vec<Monitor>> {
    tx.scan(Table::Monitors, "")
}

fn monitors_for_org(tx: &impl Reader, org_id: &str) -> Result<Vec<Monitor>> {
    resolve_index(tx, Table::OrgMonitors, &child_prefix(org_id), Table::Monitors)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorFilter {
    #[serde(default)]
    pub status: Option<MonitorStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Monitors of an org, newest first.
pub fn list_monitors(tx: &impl Reader, org_id: &str, filter: &MonitorFilter) -> Result<Vec<Monitor>> {
    let mut monitors: Vec<Monitor> = monitors_for_org(tx, org_id)?
        .into_iter()
        .filter(|m| filter.status.map_or(true, |s| m.status == s))
        .collect();
    monitors.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    if let Some(limit) = filter.limit {
        monitors.truncate(limit);
    }
    Ok(monitors)
}

/// Runs of a monitor, newest first.
pub fn list_runs(tx: &impl Reader, monitor_id: &str, limit: usize) -> Result<Vec<Run>> {
    tx.scan_rev(Table::Runs, &child_prefix(monitor_id), limit)
}

pub fn monitor_health(tx: &impl Reader, monitor: &Monitor, now: DateTime<Utc>) -> Result<HealthScore> {
    let runs: Vec<Run> = tx.scan(Table::Runs, &child_prefix(&monitor.id))?;
    let actual_runs = runs.iter().filter(|r| r.outcome.is_completed()).count() as u64;
    let successful_runs = runs
        .iter()
        .filter(|r| r.outcome == RunOutcome::Success)
        .count() as u64;
    Ok(health_score(&HealthInput {
        expected_runs: schedule::expected_runs(&monitor.schedule, monitor.created_at, now),
        actual_runs,
        successful_runs,
        durations: monitor.duration_stats,
    }))
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

pub(crate) fn save_monitor(tx: &WriteTx, monitor: &Monitor) -> Result<()> {
    tx.put(Table::Monitors, &monitor.id, monitor)
}

pub(crate) fn save_run(tx: &WriteTx, run: &Run) -> Result<()> {
    tx.put(Table::Runs, &run.key(), run)
}

/// Disable or re-enable a monitor. Re-enabling restarts the schedule from `now`.
pub fn set_enabled(tx: &WriteTx, id: &str, enabled: bool, now: DateTime<Utc>) -> Result<Monitor> {
    let mut monitor = get_monitor(tx, id)?;
    if enabled {
        if monitor.is_disabled() {
            monitor.status = MonitorStatus::Ok;
            monitor.next_due_at = Some(schedule::next_due_at(&monitor.schedule, now)?);
        }
    } else {
        monitor.status = MonitorStatus::Disabled;
    }
    monitor.updated_at = now;
    save_monitor(tx, &monitor)?;
    Ok(monitor)
}

/// Delete a monitor with its runs, incidents and ping token.
pub fn delete_monitor(tx: &WriteTx, id: &str) -> Result<Monitor> {
    let monitor = get_monitor(tx, id)?;
    tx.remove_prefix(Table::Runs, &child_prefix(id))?;
    tx.remove(Table::MonitorTokens, &monitor.token)?;
    crate::incident::delete_for_monitor(tx, &monitor)?;
    for mut other in monitors_for_org(tx, &monitor.org_id)? {
        if other.depends_on.iter().any(|d| d == id) {
            other.depends_on.retain(|d| d != id);
            save_monitor(tx, &other)?;
        }
    }
    tx.remove(Table::OrgMonitors, &index_key(&monitor.org_id, id))?;
    tx.remove(Table::Monitors, id)?;
    Ok(monitor)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::account::{create_org, Org};
    use crate::store::Store;
    use crate::types::ScheduleType;
    use chrono::Duration;
    use tempfile::TempDir;

    pub(crate) fn new_monitor(org_id: &str, name: &str, interval: u64) -> NewMonitor {
        NewMonitor {
            org_id: org_id.to_string(),
            name: name.to_string(),
            schedule: ScheduleSpec::interval(interval),
            grace_sec: None,
            tags: vec![],
            capture_output: false,
            capture_limit_kb: None,
            depends_on: vec![],
        }
    }

    fn setup(limit: u32) -> (TempDir, Store, Org) {
        let dir = TempDir::new().unwrap();
        let store = Store::open_in(dir.path()).unwrap();
        let org = store
            .write(|tx| create_org(tx, "Acme", limit, Utc::now()))
            .unwrap();
        (dir, store, org)
    }

    #[test]
    fn create_applies_defaults() {
        let (_dir, store, org) = setup(5);
        let now = Utc::now();
        let m = store
            .write(|tx| create_monitor(tx, new_monitor(&org.id, "backup", 3600), now))
            .unwrap();
        assert!(m.token.starts_with("pg_"));
        assert_eq!(m.grace_sec, 300);
        assert_eq!(m.capture_limit_kb, 32);
        assert_eq!(m.status, MonitorStatus::Ok);
        assert_eq!(m.next_due_at, Some(now + Duration::seconds(3600)));

        let by_token = store.read(|tx| monitor_by_token(tx, &m.token)).unwrap();
        assert_eq!(by_token.id, m.id);
    }

    #[test]
    fn invalid_input_reports_every_field() {
        let (_dir, store, org) = setup(5);
        let mut input = new_monitor(&org.id, "", 60);
        input.schedule = ScheduleSpec {
            schedule_type: ScheduleType::Cron,
            interval_sec: None,
            cron_expr: None,
            timezone: "UTC".into(),
        };
        input.grace_sec = Some(MAX_GRACE_SEC + 1);
        let err = store
            .write(|tx| create_monitor(tx, input, Utc::now()))
            .unwrap_err();
        match err {
            SaturnError::Validation(issues) => {
                let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "graceSec", "cronExpr"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn org_limit_is_enforced() {
        let (_dir, store, org) = setup(1);
        let now = Utc::now();
        store
            .write(|tx| create_monitor(tx, new_monitor(&org.id, "one", 60), now))
            .unwrap();
        let err = store
            .write(|tx| create_monitor(tx, new_monitor(&org.id, "two", 60), now))
            .unwrap_err();
        assert!(matches!(err, SaturnError::MonitorLimit(1)));
    }

    #[test]
    fn list_filters_by_status() {
        let (_dir, store, org) = setup(5);
        let now = Utc::now();
        let a = store
            .write(|tx| create_monitor(tx, new_monitor(&org.id, "a", 60), now))
            .unwrap();
        store
            .write(|tx| create_monitor(tx, new_monitor(&org.id, "b", 60), now + Duration::seconds(1)))
            .unwrap();
        store.write(|tx| set_enabled(tx, &a.id, false, now)).unwrap();

        let all = store
            .read(|tx| list_monitors(tx, &org.id, &MonitorFilter::default()))
            .unwrap();
        assert_eq!(all.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(), vec!["b", "a"]);

        let disabled = store
            .read(|tx| {
                list_monitors(
                    tx,
                    &org.id,
                    &MonitorFilter {
                        status: Some(MonitorStatus::Disabled),
                        limit: None,
                    },
                )
            })
            .unwrap();
        assert_eq!(disabled.len(), 1);
        assert_eq!(disabled[0].id, a.id);
    }

    #[test]
    fn reenable_restarts_schedule() {
        let (_dir, store, org) = setup(5);
        let now = Utc::now();
        let m = store
            .write(|tx| create_monitor(tx, new_monitor(&org.id, "a", 60), now))
            .unwrap();
        store.write(|tx| set_enabled(tx, &m.id, false, now)).unwrap();
        let later = now + Duration::hours(2);
        let m = store.write(|tx| set_enabled(tx, &m.id, true, later)).unwrap();
        assert_eq!(m.status, MonitorStatus::Ok);
        assert_eq!(m.next_due_at, Some(later + Duration::seconds(60)));
    }

    #[test]
    fn delete_removes_runs_and_token() {
        let (_dir, store, org) = setup(5);
        let now = Utc::now();
        let m = store
            .write(|tx| create_monitor(tx, new_monitor(&org.id, "a", 60), now))
            .unwrap();
        store
            .write(|tx| save_run(tx, &Run::new(&m.id, now, RunOutcome::Success)))
            .unwrap();
        assert_eq!(store.read(|tx| list_runs(tx, &m.id, 10)).unwrap().len(), 1);

        store.write(|tx| delete_monitor(tx, &m.id)).unwrap();
        assert!(store.read(|tx| list_runs(tx, &m.id, 10)).unwrap().is_empty());
        assert!(matches!(
            store.read(|tx| monitor_by_token(tx, &m.token)).unwrap_err(),
            SaturnError::MonitorNotFound(_)
        ));
    }
}
