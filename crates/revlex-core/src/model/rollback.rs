use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patch::Patch;

/// Kind of history-rewinding operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackKind {
    /// Everything after the target sequence is undone
    Full,
    /// Only the listed snapshots are undone
    Selective,
    CherryPick,
}

impl RollbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollbackKind::Full => "full",
            RollbackKind::Selective => "selective",
            RollbackKind::CherryPick => "cherry_pick",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(RollbackKind::Full),
            "selective" => Some(RollbackKind::Selective),
            "cherry_pick" => Some(RollbackKind::CherryPick),
            _ => None,
        }
    }
}

/// Audit record for a rollback, selective revert or cherry-pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    /// Unique identifier (`rbk:<uuid v7>`)
    pub id: String,

    /// Customization whose history the record is attached to
    pub customization_id: String,

    /// Head sequence before the operation
    pub from_seq: u64,

    /// Rollback target, or the new head for selective revert and cherry-pick
    pub to_seq: u64,

    pub kind: RollbackKind,

    /// Snapshots undone (rollback/revert) or picked (cherry-pick)
    pub affected_snapshot_ids: Vec<String>,

    /// Patch that was applied to the live text
    pub resulting_patch: Patch,

    /// Branch created by a branch rollback, or the cherry-pick source
    pub related_customization_id: Option<String>,

    pub reason: Option<String>,

    pub actor: String,

    pub created_at: DateTime<Utc>,
}
