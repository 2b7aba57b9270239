//! Delta types produced by the diff codec.
//!
//! All types implement `Debug, Clone, Serialize, Deserialize, PartialEq` so
//! they can be persisted or returned to callers verbatim.

use serde::{Deserialize, Serialize};

/// Kind of a single line change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineChangeKind {
    /// Line exists only in the new text
    Add,
    /// Line exists only in the old text
    Delete,
    /// Line exists in both texts at this position with different content
    Modify,
}

/// One changed line.
///
/// `line` is 1-based and means the same position in both texts: for `add`
/// it is the position in the new text, for `delete` the position in the old
/// text, and for `modify` both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineChange {
    pub kind: LineChangeKind,
    pub line: usize,
    /// Content in the old text (`delete`, `modify`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    /// Content in the new text (`add`, `modify`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
}

impl LineChange {
    pub fn add(line: usize, content: impl Into<String>) -> Self {
        Self {
            kind: LineChangeKind::Add,
            line,
            old_content: None,
            new_content: Some(content.into()),
        }
    }

    pub fn delete(line: usize, content: impl Into<String>) -> Self {
        Self {
            kind: LineChangeKind::Delete,
            line,
            old_content: Some(content.into()),
            new_content: None,
        }
    }

    pub fn modify(line: usize, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            kind: LineChangeKind::Modify,
            line,
            old_content: Some(old.into()),
            new_content: Some(new.into()),
        }
    }
}

/// Line-level delta between two texts.
///
/// Only changed lines are stored; unchanged lines are implied by position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LineDelta {
    pub changes: Vec<LineChange>,
    pub old_line_count: usize,
    pub new_line_count: usize,
}

impl LineDelta {
    /// False when both texts were identical
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Count changes of one kind
    pub fn count(&self, kind: LineChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}

/// One line inside a unified-diff hunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum HunkLine {
    /// ` ` line present in both texts
    Context(String),
    /// `-` line removed from the old text
    Removed(String),
    /// `+` line added in the new text
    Added(String),
}

/// Contiguous block of context and changed lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// `@@ -a,b +c,d @@`
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_len, self.new_start, self.new_len
        )
    }
}

/// Unified-diff form of a delta
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnifiedDelta {
    pub old_label: String,
    pub new_label: String,
    pub hunks: Vec<Hunk>,
}

impl UnifiedDelta {
    pub fn has_changes(&self) -> bool {
        !self.hunks.is_empty()
    }
}

/// Size and change statistics for a computed delta
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeltaStats {
    pub additions: usize,
    pub deletions: usize,
    pub modifications: usize,
    pub unchanged: usize,
    pub old_line_count: usize,
    pub new_line_count: usize,
    /// Bytes of line content held by the delta
    pub stored_bytes: usize,
    /// Bytes needed to store both full texts
    pub full_bytes: usize,
    /// `1 - stored_bytes / full_bytes`, 0.0 when both texts are empty
    pub savings_ratio: f64,
}

/// Every form of the delta between two texts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputedDelta {
    pub line_delta: LineDelta,
    pub unified_delta: UnifiedDelta,
    pub stats: DeltaStats,
}

impl ComputedDelta {
    pub fn has_changes(&self) -> bool {
        self.line_delta.has_changes()
    }
}

/// A delta in either supported form, accepted by `apply_delta`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum Delta {
    Line(LineDelta),
    Unified(UnifiedDelta),
}
