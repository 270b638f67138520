//! Due-time computation for monitor schedules.
//!
//! A monitor either expects a ping every `interval_sec` seconds or on every
//! occurrence of a cron expression evaluated in an IANA timezone. Standard
//! five-field crontab expressions are accepted and translated to the
//! seconds-first dialect understood by the `cron` crate.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, SaturnError};
use crate::types::ScheduleType;

pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Upper bound accepted for a monitor's grace period (30 days).
pub const MAX_GRACE_SEC: u64 = 30 * 86_400;

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

/// How often a monitor expects to hear from its job.
///
/// Exactly one of `interval_sec` / `cron_expr` is meaningful, selected by
/// `schedule_type`. The other field is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSpec {
    pub schedule_type: ScheduleType,
    #[serde(default)]
    pub interval_sec: Option<u64>,
    #[serde(default)]
    pub cron_expr: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl ScheduleSpec {
    pub fn interval(seconds: u64) -> Self {
        Self {
            schedule_type: ScheduleType::Interval,
            interval_sec: Some(seconds),
            cron_expr: None,
            timezone: default_timezone(),
        }
    }

    pub fn cron(expr: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            schedule_type: ScheduleType::Cron,
            interval_sec: None,
            cron_expr: Some(expr.into()),
            timezone: timezone.into(),
        }
    }
}

/// Compute the next instant a ping is due, strictly after `from`.
pub fn next_due_at(spec: &ScheduleSpec, from: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match spec.schedule_type {
        ScheduleType::Interval => {
            let secs = spec.interval_sec.ok_or_else(|| {
                SaturnError::invalid(
                    "intervalSec",
                    "intervalSec is required for INTERVAL schedule type",
                )
            })?;
            if secs == 0 {
                return Err(SaturnError::invalid(
                    "intervalSec",
                    "intervalSec must be positive",
                ));
            }
            i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|d| from.checked_add_signed(d))
                .ok_or_else(|| SaturnError::invalid("intervalSec", "intervalSec is too large"))
        }
        ScheduleType::Cron => {
            let expr = spec
                .cron_expr
                .as_deref()
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| {
                    SaturnError::invalid("cronExpr", "cronExpr is required for CRON schedule type")
                })?;
            let tz: Tz = spec.timezone.parse().map_err(|_| {
                SaturnError::invalid("timezone", format!("unknown timezone: {}", spec.timezone))
            })?;
            let schedule = parse_cron(expr)?;
            schedule
                .after(&from.with_timezone(&tz))
                .next()
                .map(|t| t.with_timezone(&Utc))
                .ok_or_else(|| {
                    SaturnError::invalid(
                        "cronExpr",
                        format!("cron expression never fires again: {expr}"),
                    )
                })
        }
    }
}

/// True once `now` has passed the due time plus the grace period.
pub fn is_run_late(next_due_at: DateTime<Utc>, grace_sec: u64, now: DateTime<Utc>) -> bool {
    now > next_due_at + grace(grace_sec)
}

/// `Duration` for a grace period, saturating on absurd values.
pub fn grace(grace_sec: u64) -> Duration {
    let secs = i64::try_from(grace_sec).unwrap_or(i64::MAX);
    Duration::seconds(secs.min(MAX_GRACE_SEC as i64))
}

/// Short human label such as `Every 5m` or the raw cron expression.
pub fn format_schedule(spec: &ScheduleSpec) -> String {
    match (spec.schedule_type, spec.interval_sec, spec.cron_expr.as_deref()) {
        (ScheduleType::Interval, Some(secs), _) if secs > 0 => {
            if secs < 60 {
                format!("Every {secs}s")
            } else if secs < 3600 {
                format!("Every {}m", secs / 60)
            } else if secs < 86_400 {
                format!("Every {}h", secs / 3600)
            } else {
                format!("Every {}d", secs / 86_400)
            }
        }
        (ScheduleType::Cron, _, Some(expr)) if !expr.is_empty() => expr.to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Number of runs a monitor should have produced since `created_at`.
///
/// Cron schedules are approximated as one run per day of age.
pub fn expected_runs(spec: &ScheduleSpec, created_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let age_ms = (now - created_at).num_milliseconds().max(0) as u64;
    match (spec.schedule_type, spec.interval_sec) {
        (ScheduleType::Interval, Some(secs)) if secs > 0 => age_ms / (secs * 1000),
        (ScheduleType::Cron, _) => age_ms / 86_400_000,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Cron parsing
// ---------------------------------------------------------------------------

fn parse_cron(expr: &str) -> Result<cron::Schedule> {
    let normalized = normalize_cron(expr);
    cron::Schedule::from_str(&normalized).map_err(|_| {
        SaturnError::invalid("cronExpr", format!("Invalid cron expression: {expr}"))
    })
}

/// Translate a crontab expression into the `cron` crate dialect.
///
/// Five-field expressions gain a leading `0` seconds field and their numeric
/// day-of-week values move from crontab numbering (0/7 = Sunday) to the
/// crate's 1 = Sunday .. 7 = Saturday.
fn normalize_cron(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return fields.join(" ");
    }
    let dow = translate_dow_field(fields[4]);
    format!(
        "0 {} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], dow
    )
}

fn translate_dow_field(field: &str) -> String {
    field
        .split(',')
        .map(translate_dow_part)
        .collect::<Vec<_>>()
        .join(",")
}

fn translate_dow_part(part: &str) -> String {
    let (range, step) = match part.split_once('/') {
        Some((r, s)) => (r, Some(s)),
        None => (part, None),
    };
    let with_step = |r: String| match step {
        Some(s) => format!("{r}/{s}"),
        None => r,
    };

    match range.split_once('-') {
        Some((a, b)) => match (a.parse::<u8>(), b.parse::<u8>()) {
            (Ok(a), Ok(7)) if a > 0 && step.is_none() => format!("{}-7,1", a + 1),
            (Ok(a), Ok(b)) if a <= 6 && b <= 6 => with_step(format!("{}-{}", a + 1, b + 1)),
            _ => with_step(range.to_string()),
        },
        None => match range.parse::<u8>() {
            Ok(0) | Ok(7) => with_step("1".to_string()),
            Ok(n) if n <= 6 => with_step((n + 1).to_string()),
            _ => with_step(range.to_string()),
        },
    }
}
