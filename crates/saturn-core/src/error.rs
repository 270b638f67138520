use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single failed validation rule, reported back to API callers as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SaturnError {
    #[error("monitor not found: {0}")]
    MonitorNotFound(String),

    #[error("incident not found: {0}")]
    IncidentNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("org not found: {0}")]
    OrgNotFound(String),

    #[error("maintenance window not found: {0}")]
    WindowNotFound(String),

    #[error("email already registered: {0}")]
    EmailExists(String),

    #[error("validation failed: {}", describe_issues(.0))]
    Validation(Vec<FieldIssue>),

    #[error("invalid transition for incident {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("monitor limit reached ({0}), upgrade the plan to add more")]
    MonitorLimit(u32),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SaturnError {
    /// Shorthand for a validation failure on a single field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldIssue::new(field, message)])
    }
}

fn describe_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.field, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<redb::Error> for SaturnError {
    fn from(e: redb::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SaturnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let err = SaturnError::Validation(vec![
            FieldIssue::new("name", "must not be empty"),
            FieldIssue::new("graceSec", "must be positive"),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: name: must not be empty; graceSec: must be positive"
        );
    }

    #[test]
    fn invalid_builds_single_issue() {
        match SaturnError::invalid("cronExpr", "required") {
            SaturnError::Validation(issues) => {
                assert_eq!(issues, vec![FieldIssue::new("cronExpr", "required")]);
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
