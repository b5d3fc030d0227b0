//! Replica identity, role and observed state.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role tag recognized as a reader. Exact, case-sensitive match; every other
/// tag (including casing variants) classifies as a writer.
pub const READER_TAG: &str = "READER";

/// Read/write role of a replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaRole {
    Reader,
    Writer,
}

impl ReplicaRole {
    /// Classify a raw role tag.
    pub fn from_tag(tag: &str) -> Self {
        if tag == READER_TAG {
            ReplicaRole::Reader
        } else {
            ReplicaRole::Writer
        }
    }
}

/// One raw row as returned by the snapshot source, before classification.
///
/// Missing or NULL columns map to empty strings so a partial row never
/// aborts the poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicaRow {
    pub host: String,
    pub database: String,
    pub cube_name: String,
    pub role_tag: String,
    pub last_schema_change: String,
}

/// One replica's observed state as handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaInfo {
    pub host: String,
    pub database: String,
    pub cube_name: String,
    pub role: ReplicaRole,
    /// True only in the one copy, within a single rotation view, that the
    /// view recommends as the replica to use right now.
    pub active: bool,
    pub last_schema_change: DateTime<Utc>,
}

impl ReplicaInfo {
    /// Build a typed replica entry from a raw row.
    ///
    /// An unparseable timestamp is logged and replaced with the epoch
    /// sentinel; the row itself is always kept.
    pub fn from_row(row: &ReplicaRow) -> Self {
        let last_schema_change = match parse_schema_change(row.last_schema_change.trim()) {
            Some(ts) => ts,
            None => {
                tracing::warn!(
                    host = %row.host,
                    cube = %row.cube_name,
                    raw = %row.last_schema_change,
                    "Unparseable last-schema-change timestamp, using epoch sentinel"
                );
                DateTime::UNIX_EPOCH
            }
        };

        Self {
            host: row.host.trim().to_string(),
            database: row.database.trim().to_string(),
            cube_name: row.cube_name.trim().to_string(),
            role: ReplicaRole::from_tag(&row.role_tag),
            active: false,
            last_schema_change,
        }
    }

    pub fn is_reader(&self) -> bool {
        self.role == ReplicaRole::Reader
    }
}

/// Accepts RFC 3339 or a plain `YYYY-MM-DD HH:MM:SS` wall-clock value.
fn parse_schema_change(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
