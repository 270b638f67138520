//! Embedded persistence using redb.
//!
//! # Table design
//!
//! Every table maps a string key to a JSON-encoded record. Child records
//! that need chronological scans use composite keys:
//! ```text
//! runs:              {monitor_id}/{started_at_ms:020}/{uuid}
//! incident_events:   {incident_id}/{at_ms:020}/{uuid}
//! memberships:       {org_id}/{user_id}
//! ```
//! The timestamp is zero-padded, so lexicographic key order equals time
//! order and a prefix range scan returns a parent's children oldest first.
//!
//! Records looked up by more than one parent live in their own table keyed
//! by id, with index tables whose values are that id:
//! ```text
//! org_monitors:      {org_id}/{monitor_id}
//! monitor_incidents: {monitor_id}/{opened_at_ms:020}/{incident_id}
//! org_incidents:     {org_id}/{opened_at_ms:020}/{incident_id}
//! active_incidents:  {monitor_id}/{incident_id}   (removed on resolve)
//! org_windows:       {org_id}/{window_id}
//! ```
//!
//! All work happens inside [`Store::read`] or [`Store::write`] closures. A
//! write closure that returns `Err` aborts the transaction, so multi-record
//! operations are atomic.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SaturnError};

/// File name of the database inside the data directory.
pub const DB_FILE: &str = "saturn.redb";

type Def = TableDefinition<'static, &'static str, &'static [u8]>;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Orgs,
    Users,
    /// lowercased email -> user id
    UserEmails,
    Memberships,
    /// token hash -> session
    Sessions,
    Monitors,
    OrgMonitors,
    /// ping token -> monitor id
    MonitorTokens,
    Runs,
    Incidents,
    MonitorIncidents,
    OrgIncidents,
    ActiveIncidents,
    IncidentEvents,
    MaintenanceWindows,
    OrgWindows,
    AlertChannels,
}

impl Table {
    pub const ALL: [Table; 17] = [
        Table::Orgs,
        Table::Users,
        Table::UserEmails,
        Table::Memberships,
        Table::Sessions,
        Table::Monitors,
        Table::OrgMonitors,
        Table::MonitorTokens,
        Table::Runs,
        Table::Incidents,
        Table::MonitorIncidents,
        Table::OrgIncidents,
        Table::ActiveIncidents,
        Table::IncidentEvents,
        Table::MaintenanceWindows,
        Table::OrgWindows,
        Table::AlertChannels,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Orgs => "orgs",
            Table::Users => "users",
            Table::UserEmails => "user_emails",
            Table::Memberships => "memberships",
            Table::Sessions => "sessions",
            Table::Monitors => "monitors",
            Table::OrgMonitors => "org_monitors",
            Table::MonitorTokens => "monitor_tokens",
            Table::Runs => "runs",
            Table::Incidents => "incidents",
            Table::MonitorIncidents => "monitor_incidents",
            Table::OrgIncidents => "org_incidents",
            Table::ActiveIncidents => "active_incidents",
            Table::IncidentEvents => "incident_events",
            Table::MaintenanceWindows => "maintenance_windows",
            Table::OrgWindows => "org_windows",
            Table::AlertChannels => "alert_channels",
        }
    }

    fn def(self) -> Def {
        TableDefinition::new(self.name())
    }
}

// ---------------------------------------------------------------------------
// Key helpers
// ---------------------------------------------------------------------------

/// `{parent}/{ms:020}/{uuid}`: sorts children of `parent` by time.
pub fn child_key(parent: &str, at: DateTime<Utc>, id: impl fmt::Display) -> String {
    let ms = at.timestamp_millis().max(0) as u64;
    format!("{parent}/{ms:020}/{id}")
}

/// Prefix covering every child key of `parent`.
pub fn child_prefix(parent: &str) -> String {
    format!("{parent}/")
}

/// `{parent}/{id}`: unordered membership of `id` under `parent`.
pub fn index_key(parent: &str, id: &str) -> String {
    format!("{parent}/{id}")
}

/// Smallest string greater than every string starting with `prefix`.
fn prefix_end(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        if let Some(next) = char::from_u32(last as u32 + 1) {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

fn storage(e: impl Into<redb::Error>) -> SaturnError {
    SaturnError::from(e.into())
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Read access shared by read and write transactions.
pub trait Reader {
    fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<Option<T>>;

    /// Records whose key starts with `prefix`, in key order.
    fn scan<T: DeserializeOwned>(&self, table: Table, prefix: &str) -> Result<Vec<T>>;

    /// Up to `limit` records whose key starts with `prefix`, in reverse key order.
    fn scan_rev<T: DeserializeOwned>(&self, table: Table, prefix: &str, limit: usize)
        -> Result<Vec<T>>;
}

/// Load the `target` records whose ids are stored in `index` under
/// `prefix`, in index key order. Ids with no record are skipped.
pub fn resolve_index<T: DeserializeOwned>(
    tx: &impl Reader,
    index: Table,
    prefix: &str,
    target: Table,
) -> Result<Vec<T>> {
    let ids: Vec<String> = tx.scan(index, prefix)?;
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(record) = tx.get(target, &id)? {
            out.push(record);
        }
    }
    Ok(out)
}

fn get_in<T, R>(table: &R, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key).map_err(storage)? {
        Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
        None => Ok(None),
    }
}

fn scan_in<T, R>(table: &R, prefix: &str, reverse: bool, limit: usize) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let end = prefix_end(prefix);
    let range = match &end {
        Some(end) => table.range(prefix..end.as_str()),
        None => table.range(prefix..),
    }
    .map_err(storage)?;

    let mut out = Vec::new();
    if reverse {
        for entry in range.rev().take(limit) {
            let (_, v) = entry.map_err(storage)?;
            out.push(serde_json::from_slice(v.value())?);
        }
    } else {
        for entry in range.take(limit) {
            let (_, v) = entry.map_err(storage)?;
            out.push(serde_json::from_slice(v.value())?);
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

pub struct ReadTx {
    txn: redb::ReadTransaction,
}

impl Reader for ReadTx {
    fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<Option<T>> {
        let t = self.txn.open_table(table.def()).map_err(storage)?;
        get_in(&t, key)
    }

    fn scan<T: DeserializeOwned>(&self, table: Table, prefix: &str) -> Result<Vec<T>> {
        let t = self.txn.open_table(table.def()).map_err(storage)?;
        scan_in(&t, prefix, false, usize::MAX)
    }

    fn scan_rev<T: DeserializeOwned>(
        &self,
        table: Table,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<T>> {
        let t = self.txn.open_table(table.def()).map_err(storage)?;
        scan_in(&t, prefix, true, limit)
    }
}

pub struct WriteTx {
    txn: redb::WriteTransaction,
}

impl WriteTx {
    pub fn put<T: Serialize>(&self, table: Table, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        let mut t = self.txn.open_table(table.def()).map_err(storage)?;
        t.insert(key, bytes.as_slice()).map_err(storage)?;
        Ok(())
    }

    /// Remove `key`; returns whether it existed.
    pub fn remove(&self, table: Table, key: &str) -> Result<bool> {
        let mut t = self.txn.open_table(table.def()).map_err(storage)?;
        let existed = t.remove(key).map_err(storage)?.is_some();
        Ok(existed)
    }

    /// Remove every key starting with `prefix`; returns how many were removed.
    pub fn remove_prefix(&self, table: Table, prefix: &str) -> Result<usize> {
        let mut t = self.txn.open_table(table.def()).map_err(storage)?;
        let end = prefix_end(prefix);
        let keys: Vec<String> = {
            let range = match &end {
                Some(end) => t.range(prefix..end.as_str()),
                None => t.range(prefix..),
            }
            .map_err(storage)?;
            let mut keys = Vec::new();
            for entry in range {
                let (k, _) = entry.map_err(storage)?;
                keys.push(k.value().to_string());
            }
            keys
        };
        for key in &keys {
            t.remove(key.as_str()).map_err(storage)?;
        }
        Ok(keys.len())
    }
}

impl Reader for WriteTx {
    fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<Option<T>> {
        let t = self.txn.open_table(table.def()).map_err(storage)?;
        get_in(&t, key)
    }

    fn scan<T: DeserializeOwned>(&self, table: Table, prefix: &str) -> Result<Vec<T>> {
        let t = self.txn.open_table(table.def()).map_err(storage)?;
        scan_in(&t, prefix, false, usize::MAX)
    }

    fn scan_rev<T: DeserializeOwned>(
        &self,
        table: Table,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<T>> {
        let t = self.txn.open_table(table.def()).map_err(storage)?;
        scan_in(&t, prefix, true, limit)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct Store {
    db: Database,
}

impl Store {
    /// Open or create the database at `path`, creating every table.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(storage)?;
        let wt = db.begin_write().map_err(storage)?;
        for table in Table::ALL {
            wt.open_table(table.def()).map_err(storage)?;
        }
        wt.commit().map_err(storage)?;
        Ok(Self { db })
    }

    /// Open `<data_dir>/saturn.redb`.
    pub fn open_in(data_dir: &Path) -> Result<Self> {
        Self::open(&data_dir.join(DB_FILE))
    }

    pub fn read<T>(&self, f: impl FnOnce(&ReadTx) -> Result<T>) -> Result<T> {
        let tx = ReadTx {
            txn: self.db.begin_read().map_err(storage)?,
        };
        f(&tx)
    }

    /// Run `f` in a write transaction, committing only when it succeeds.
    pub fn write<T>(&self, f: impl FnOnce(&WriteTx) -> Result<T>) -> Result<T> {
        let tx = WriteTx {
            txn: self.db.begin_write().map_err(storage)?,
        };
        let value = f(&tx)?;
        tx.txn.commit().map_err(storage)?;
        Ok(value)
    }
}
