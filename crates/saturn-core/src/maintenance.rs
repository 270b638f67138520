use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FieldIssue, Result, SaturnError};
use crate::store::{child_prefix, index_key, resolve_index, Reader, Table, WriteTx};

// ---------------------------------------------------------------------------
// Recurrence
// ---------------------------------------------------------------------------

/// How a maintenance window repeats.
///
/// Recurring windows only use the time-of-day part of `start_time` and
/// `end_time`. Weekly `days` use 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly {
        #[serde(default)]
        days: Vec<u8>,
    },
}

// ---------------------------------------------------------------------------
// MaintenanceWindow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    pub id: String,
    pub org_id: String,
    /// `None` means the window covers every monitor in the org.
    #[serde(default)]
    pub monitor_id: Option<String>,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl MaintenanceWindow {
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.recurrence {
            Recurrence::None => self.start_time <= time && time <= self.end_time,
            Recurrence::Daily => self.contains_time_of_day(time),
            Recurrence::Weekly { days } => {
                let weekday = time.weekday().num_days_from_sunday() as u8;
                (days.is_empty() || days.contains(&weekday)) && self.contains_time_of_day(time)
            }
        }
    }

    pub fn applies_to(&self, monitor_id: &str, org_id: &str) -> bool {
        match &self.monitor_id {
            Some(id) => id == monitor_id,
            None => self.org_id == org_id,
        }
    }

    fn contains_time_of_day(&self, time: DateTime<Utc>) -> bool {
        let start = minute_of_day(self.start_time);
        let end = minute_of_day(self.end_time);
        let now = minute_of_day(time);
        if start <= end {
            start <= now && now <= end
        } else {
            // Wraps past midnight.
            now >= start || now <= end
        }
    }
}

fn minute_of_day(t: DateTime<Utc>) -> u32 {
    t.hour() * 60 + t.minute()
}

// ---------------------------------------------------------------------------
// Storage operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWindow {
    pub org_id: String,
    #[serde(default)]
    pub monitor_id: Option<String>,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Recurrence,
}

pub fn create_window(tx: &WriteTx, input: NewWindow, now: DateTime<Utc>) -> Result<MaintenanceWindow> {
    let mut issues = Vec::new();
    let name_len = input.name.chars().count();
    if name_len == 0 || name_len > 100 {
        issues.push(FieldIssue::new("name", "name must be 1-100 characters"));
    }
    if input.start_time >= input.end_time {
        issues.push(FieldIssue::new("endTime", "End time must be after start time"));
    }
    if input.recurrence == Recurrence::None && input.start_time < now {
        issues.push(FieldIssue::new("startTime", "Start time cannot be in the past"));
    }
    if let Recurrence::Weekly { days } = &input.recurrence {
        if days.iter().any(|d| *d > 6) {
            issues.push(FieldIssue::new("recurrence", "weekdays must be 0 (Sunday) to 6"));
        }
    }
    if !issues.is_empty() {
        return Err(SaturnError::Validation(issues));
    }

    if let Some(monitor_id) = &input.monitor_id {
        let monitor = crate::monitor::get_monitor(tx, monitor_id)?;
        if monitor.org_id != input.org_id {
            return Err(SaturnError::MonitorNotFound(monitor_id.clone()));
        }
    }

    if input.recurrence == Recurrence::None {
        let overlapping = list_windows(tx, &input.org_id)?.into_iter().find(|w| {
            w.recurrence == Recurrence::None
                && w.monitor_id == input.monitor_id
                && w.start_time <= input.end_time
                && w.end_time >= input.start_time
        });
        if let Some(w) = overlapping {
            return Err(SaturnError::invalid(
                "startTime",
                format!("Maintenance window overlaps with existing window \"{}\"", w.name),
            ));
        }
    }

    let window = MaintenanceWindow {
        id: Uuid::new_v4().to_string(),
        org_id: input.org_id,
        monitor_id: input.monitor_id,
        name: input.name,
        start_time: input.start_time,
        end_time: input.end_time,
        recurrence: input.recurrence,
        enabled: true,
        created_at: now,
    };
    tx.put(Table::MaintenanceWindows, &window.id, &window)?;
    tx.put(Table::OrgWindows, &index_key(&window.org_id, &window.id), &window.id)?;
    Ok(window)
}

/// Windows for an org, latest start first.
pub fn list_windows(tx: &impl Reader, org_id: &str) -> Result<Vec<MaintenanceWindow>> {
    let mut windows: Vec<MaintenanceWindow> = resolve_index(
        tx,
        Table::OrgWindows,
        &child_prefix(org_id),
        Table::MaintenanceWindows,
    )?;
    windows.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    Ok(windows)
}

pub fn get_window(tx: &impl Reader, id: &str) -> Result<MaintenanceWindow> {
    tx.get(Table::MaintenanceWindows, id)?
        .ok_or_else(|| SaturnError::WindowNotFound(id.to_string()))
}

pub fn delete_window(tx: &WriteTx, id: &str) -> Result<MaintenanceWindow> {
    let window = get_window(tx, id)?;
    tx.remove(Table::OrgWindows, &index_key(&window.org_id, id))?;
    tx.remove(Table::MaintenanceWindows, id)?;
    Ok(window)
}

/// The first enabled window covering `monitor_id` at `at`, if any.
pub fn active_window(
    tx: &impl Reader,
    monitor_id: &str,
    org_id: &str,
    at: DateTime<Utc>,
) -> Result<Option<MaintenanceWindow>> {
    Ok(list_windows(tx, org_id)?
        .into_iter()
        .find(|w| w.applies_to(monitor_id, org_id) && w.contains(at)))
}
