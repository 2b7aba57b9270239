use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patch::Patch;

/// What produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Sequence 1, records the baseline
    Initial,
    Manual,
    /// Produced by a generative assistant
    Ai,
    Rollback,
    CherryPick,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Initial => "initial",
            ChangeKind::Manual => "manual",
            ChangeKind::Ai => "ai",
            ChangeKind::Rollback => "rollback",
            ChangeKind::CherryPick => "cherry_pick",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(ChangeKind::Initial),
            "manual" => Some(ChangeKind::Manual),
            "ai" => Some(ChangeKind::Ai),
            "rollback" => Some(ChangeKind::Rollback),
            "cherry_pick" => Some(ChangeKind::CherryPick),
            _ => None,
        }
    }
}

/// Snapshot lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Amendable by further edits in the same session
    Open,
    /// Immutable, eligible as a rollback target
    Finalized,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Open => "open",
            Lifecycle::Finalized => "finalized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Lifecycle::Open),
            "finalized" => Some(Lifecycle::Finalized),
            _ => None,
        }
    }
}

/// Snapshot - one delta record in a customization's history
///
/// Applying `forward_patch` to the text hashed by `before_hash` yields the
/// text hashed by `after_hash`; `inverse_patch` goes the other way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique identifier (`snap:<uuid v7>`)
    pub id: String,

    pub customization_id: String,

    /// 1-based, contiguous per customization
    pub sequence: u64,

    pub kind: ChangeKind,

    pub forward_patch: Patch,

    pub inverse_patch: Patch,

    pub before_hash: String,

    pub after_hash: String,

    pub lifecycle: Lifecycle,

    pub author: String,

    /// Human-readable change summary
    pub summary: String,

    pub created_at: DateTime<Utc>,

    /// Last amendment or finalization
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn is_open(&self) -> bool {
        self.lifecycle == Lifecycle::Open
    }

    pub fn is_finalized(&self) -> bool {
        self.lifecycle == Lifecycle::Finalized
    }

    /// Whether the snapshot changes the text at all
    pub fn is_noop(&self) -> bool {
        self.before_hash == self.after_hash
    }
}

/// Caller-supplied metadata for a new or amended snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMeta {
    pub kind: ChangeKind,
    pub author: String,
    /// Defaults to a generated change summary when absent
    pub summary: Option<String>,
}

impl ChangeMeta {
    pub fn manual(author: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Manual,
            author: author.into(),
            summary: None,
        }
    }

    pub fn ai(author: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Ai,
            author: author.into(),
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}
