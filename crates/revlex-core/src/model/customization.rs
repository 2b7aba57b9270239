use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::content_hash;

/// Lifecycle status of a customization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomizationStatus {
    Active,
    /// Read-only; rejects edits
    Archived,
}

impl CustomizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomizationStatus::Active => "active",
            CustomizationStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CustomizationStatus::Active),
            "archived" => Some(CustomizationStatus::Archived),
            _ => None,
        }
    }
}

/// Where a branched customization was forked from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchOrigin {
    pub customization_id: String,
    pub sequence: u64,
}

/// Customization - one editable text artifact
///
/// The baseline never changes after creation. `current_text` is always the
/// baseline folded through the forward patches of every snapshot in sequence
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customization {
    /// Unique identifier (`cust:<uuid v7>`)
    pub id: String,

    /// Opaque owning scope supplied by the caller
    pub scope: String,

    pub baseline_text: String,

    pub current_text: String,

    /// SHA-256 of `current_text`
    pub current_hash: String,

    pub status: CustomizationStatus,

    /// The single amendable snapshot, if any
    pub open_snapshot_id: Option<String>,

    /// Highest snapshot sequence (0 before the initial snapshot is recorded)
    pub head_sequence: u64,

    /// Set when this customization was created by a branch rollback
    pub origin: Option<BranchOrigin>,

    /// Optimistic concurrency counter, bumped by every committed change
    pub revision: u64,

    pub created_at: DateTime<Utc>,

    /// Last change to text or lifecycle
    pub updated_at: DateTime<Utc>,
}

impl Customization {
    /// Create a new active customization whose current text is the baseline
    pub fn new(id: String, scope: String, baseline_text: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            scope,
            current_hash: content_hash(&baseline_text),
            current_text: baseline_text.clone(),
            baseline_text,
            status: CustomizationStatus::Active,
            open_snapshot_id: None,
            head_sequence: 0,
            origin: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status == CustomizationStatus::Archived
    }

    pub fn has_open_snapshot(&self) -> bool {
        self.open_snapshot_id.is_some()
    }

    /// Sequence the next appended snapshot will get
    pub fn next_sequence(&self) -> u64 {
        self.head_sequence + 1
    }

    /// Replace the current text, keeping the hash in step
    pub fn set_current_text(&mut self, text: String, now: DateTime<Utc>) {
        self.current_hash = content_hash(&text);
        self.current_text = text;
        self.updated_at = now;
    }
}
