//! Conflict report types.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Severity scale, ordered `None < Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Severity::None),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity {:?}", other)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a finding is about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    /// Op is structurally invalid
    Malformed,
    /// Op addresses a line outside the document
    OutOfRange,
    /// A `test` op would fail
    TestMismatch,
    /// Two mutating ops address the same index
    DuplicateTarget,
    /// Op addresses a line whose position was shifted by an earlier op
    OrderDependent,
    /// Op removes an import/export/declaration line
    DeclarationRemoved,
    /// Resulting text has unbalanced brackets
    BracketImbalance,
    /// A symbol reported by the extractor disappears
    SymbolRemoved,
}

/// One analyzer finding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub category: FindingCategory,
    /// Indices of the patch ops involved (empty for whole-text findings)
    pub op_indices: Vec<usize>,
    /// 0-based line the finding refers to, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

/// Suggested way to resolve a finding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    MergeOperations,
    DropOperation,
    ReorderOperations,
    ReviewManually,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    pub action: ResolutionAction,
    pub op_indices: Vec<usize>,
    pub description: String,
}

/// What the caller should do with the analysed patch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    AutoApply,
    Warn,
    Block,
}

/// Result of analysing a patch against a text.
///
/// `conflicts` hold findings of `High` severity or worse, `warnings` the
/// rest. `severity` is the maximum over both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub severity: Severity,
    pub suggestions: Vec<Resolution>,
}

impl ConflictReport {
    pub(crate) fn push(&mut self, finding: Finding) {
        self.severity = self.severity.max(finding.severity);
        if finding.severity >= Severity::High {
            self.conflicts.push(finding);
        } else {
            self.warnings.push(finding);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.severity == Severity::None
    }

    /// Whether the report reaches `threshold`
    pub fn blocks_at(&self, threshold: Severity) -> bool {
        threshold != Severity::None && self.severity >= threshold
    }

    /// Default policy: block at `High`, warn at `Low`/`Medium`
    pub fn recommended_action(&self) -> RecommendedAction {
        match self.severity {
            Severity::None => RecommendedAction::AutoApply,
            Severity::Low | Severity::Medium => RecommendedAction::Warn,
            Severity::High | Severity::Critical => RecommendedAction::Block,
        }
    }

    /// All findings, conflicts first
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.conflicts.iter().chain(self.warnings.iter())
    }
}
