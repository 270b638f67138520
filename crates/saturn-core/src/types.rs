use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SaturnError;

// ---------------------------------------------------------------------------
// ScheduleType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleType {
    Interval,
    Cron,
}

impl ScheduleType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleType::Interval => "INTERVAL",
            ScheduleType::Cron => "CRON",
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MonitorStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorStatus {
    Ok,
    Late,
    Failing,
    Missed,
    Disabled,
}

impl MonitorStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MonitorStatus::Ok => "OK",
            MonitorStatus::Late => "LATE",
            MonitorStatus::Failing => "FAILING",
            MonitorStatus::Missed => "MISSED",
            MonitorStatus::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MonitorStatus {
    type Err = SaturnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(MonitorStatus::Ok),
            "LATE" => Ok(MonitorStatus::Late),
            "FAILING" => Ok(MonitorStatus::Failing),
            "MISSED" => Ok(MonitorStatus::Missed),
            "DISABLED" => Ok(MonitorStatus::Disabled),
            _ => Err(SaturnError::invalid(
                "status",
                format!("unknown monitor status '{s}'"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// RunOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    Started,
    Success,
    Fail,
    Late,
    Missed,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RunOutcome::Started => "STARTED",
            RunOutcome::Success => "SUCCESS",
            RunOutcome::Fail => "FAIL",
            RunOutcome::Late => "LATE",
            RunOutcome::Missed => "MISSED",
        }
    }

    /// Whether this outcome proves the job actually ran to completion.
    pub fn is_completed(self) -> bool {
        matches!(
            self,
            RunOutcome::Success | RunOutcome::Fail | RunOutcome::Late
        )
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// IncidentKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentKind {
    Missed,
    Late,
    Fail,
    Anomaly,
}

impl IncidentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IncidentKind::Missed => "MISSED",
            IncidentKind::Late => "LATE",
            IncidentKind::Fail => "FAIL",
            IncidentKind::Anomaly => "ANOMALY",
        }
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IncidentKind {
    type Err = SaturnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MISSED" => Ok(IncidentKind::Missed),
            "LATE" => Ok(IncidentKind::Late),
            "FAIL" => Ok(IncidentKind::Fail),
            "ANOMALY" => Ok(IncidentKind::Anomaly),
            _ => Err(SaturnError::invalid(
                "kind",
                format!("unknown incident kind '{s}'"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// IncidentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Open,
    Acked,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IncidentStatus::Open => "OPEN",
            IncidentStatus::Acked => "ACKED",
            IncidentStatus::Resolved => "RESOLVED",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, IncidentStatus::Open | IncidentStatus::Acked)
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IncidentStatus {
    type Err = SaturnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(IncidentStatus::Open),
            "ACKED" => Ok(IncidentStatus::Acked),
            "RESOLVED" => Ok(IncidentStatus::Resolved),
            _ => Err(SaturnError::invalid(
                "status",
                format!("unknown incident status '{s}'"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
