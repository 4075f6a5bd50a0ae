//! Opaque row identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a remote row.
///
/// The backend may hand out UUIDs or integer keys; both are carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawRowId")]
pub struct RowId(String);

impl RowId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Identifier for an entry that only exists locally (UUID v7, time-sortable).
    #[must_use]
    pub fn local() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRowId {
    Text(String),
    Integer(i64),
}

impl From<RawRowId> for RowId {
    fn from(value: RawRowId) -> Self {
        match value {
            RawRowId::Text(text) => Self(text),
            RawRowId::Integer(number) => Self(number.to_string()),
        }
    }
}
