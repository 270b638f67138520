use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{get_org, validate_name};
use crate::error::{FieldIssue, Result, SaturnError};
use crate::store::{child_key, child_prefix, Reader, Table, WriteTx};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    #[default]
    Webhook,
}

/// Where alerts for an org are delivered. Stored under `{org_id}/...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertChannel {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub kind: ChannelKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl AlertChannel {
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Copy safe to return over the API: the signing secret is dropped.
    pub fn redacted(&self) -> Self {
        Self {
            secret: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChannel {
    pub org_id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ChannelKind,
    pub url: String,
    #[serde(default)]
    pub secret: Option<String>,
}

/// True for absolute `http` or `https` URLs with a host.
pub fn is_valid_webhook_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or("");
            !host.is_empty() && !url.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn create_channel(tx: &WriteTx, input: NewChannel, now: DateTime<Utc>) -> Result<AlertChannel> {
    let mut issues = Vec::new();
    if let Err(SaturnError::Validation(mut v)) = validate_name("name", &input.name) {
        issues.append(&mut v);
    }
    if !is_valid_webhook_url(&input.url) {
        issues.push(FieldIssue::new("url", "Invalid webhook URL"));
    }
    if input.secret.as_deref().is_some_and(str::is_empty) {
        issues.push(FieldIssue::new("secret", "Secret cannot be empty"));
    }
    if !issues.is_empty() {
        return Err(SaturnError::Validation(issues));
    }
    get_org(tx, &input.org_id)?;

    let uuid = Uuid::new_v4();
    let channel = AlertChannel {
        id: uuid.to_string(),
        org_id: input.org_id,
        name: input.name,
        kind: input.kind,
        url: input.url,
        secret: input.secret,
        enabled: true,
        created_at: now,
    };
    tx.put(
        Table::AlertChannels,
        &child_key(&channel.org_id, now, uuid),
        &channel,
    )?;
    Ok(channel)
}

/// Channels for an org, oldest first.
pub fn list_channels(tx: &impl Reader, org_id: &str) -> Result<Vec<AlertChannel>> {
    tx.scan(Table::AlertChannels, &child_prefix(org_id))
}

pub fn enabled_channels(tx: &impl Reader, org_id: &str) -> Result<Vec<AlertChannel>> {
    Ok(list_channels(tx, org_id)?
        .into_iter()
        .filter(|c| c.enabled)
        .collect())
}
