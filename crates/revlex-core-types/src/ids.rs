//! Identifier generation
//!
//! Every persisted entity gets a UUIDv7 id with a short kind prefix so ids
//! stay time-ordered and self-describing in logs (`cust:0190...`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of entity an identifier names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Customization,
    Snapshot,
    RollbackRecord,
}

impl IdKind {
    /// Prefix used in generated ids
    pub fn prefix(&self) -> &'static str {
        match self {
            IdKind::Customization => "cust",
            IdKind::Snapshot => "snap",
            IdKind::RollbackRecord => "rbk",
        }
    }

    /// Generate a fresh id of this kind
    pub fn generate(&self) -> String {
        format!("{}:{}", self.prefix(), Uuid::now_v7())
    }

    /// Classify an id by its prefix
    pub fn of(id: &str) -> Option<IdKind> {
        let (prefix, rest) = id.split_once(':')?;
        if Uuid::parse_str(rest).is_err() {
            return None;
        }
        match prefix {
            "cust" => Some(IdKind::Customization),
            "snap" => Some(IdKind::Snapshot),
            "rbk" => Some(IdKind::RollbackRecord),
            _ => None,
        }
    }
}

/// Unique identifier for a single engine call, attached to its log events
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random RequestId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
