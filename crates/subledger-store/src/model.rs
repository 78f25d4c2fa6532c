//! Row types shared by all backends

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How a backend persists repeated identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Unique email; a repeat overwrites the stored row
    Upsert,
    /// No uniqueness; every submission is a new row
    AppendOnly,
}

impl WritePolicy {
    /// Snake-case label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::AppendOnly => "append_only",
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized submission ready to write
///
/// Identifier and timestamp are left to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSubscription {
    /// Display name
    pub name: String,
    /// Company, empty when not given
    pub company: String,
    /// Identity key, already lower-cased and trimmed
    pub email: String,
    /// Acquisition source tag
    pub source: String,
    /// Originating network address
    pub origin_address: String,
}

/// A row as the store holds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSubscription {
    /// Store-assigned identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Company
    pub company: String,
    /// Identity key
    pub email: String,
    /// Acquisition source tag
    pub source: String,
    /// Store-assigned submission time
    pub submitted_at: DateTime<Utc>,
    /// Originating network address
    pub origin_address: String,
}

impl StoredSubscription {
    /// Materialize `row` with a fresh id at `submitted_at`
    #[must_use]
    pub fn from_new(row: &NewSubscription, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: row.name.clone(),
            company: row.company.clone(),
            email: row.email.clone(),
            source: row.source.clone(),
            submitted_at,
            origin_address: row.origin_address.clone(),
        }
    }
}

/// Count of rows for one source tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    /// Source tag
    pub source: String,
    /// Rows with that tag
    pub count: u64,
}

impl SourceCount {
    /// Create new count
    #[inline]
    pub fn new(source: impl Into<String>, count: u64) -> Self {
        Self {
            source: source.into(),
            count,
        }
    }
}

/// Sort counts by count descending, then source ascending
pub fn order_source_counts(counts: &mut [SourceCount]) {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));
}

/// SQL identifier used as a table name
///
/// Only `[A-Za-z_][A-Za-z0-9_]*` is accepted, so the name can be spliced into
/// statement text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Validate `name`
    ///
    /// # Errors
    /// `StoreError::InvalidSettings` for anything but a plain identifier
    pub fn new(name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid_start && valid_rest {
            Ok(Self(name))
        } else {
            Err(StoreError::InvalidSettings(format!(
                "table name must be a plain identifier, got {name:?}"
            )))
        }
    }

    /// Name as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TableName {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
