//! Conflict analyzer.
//!
//! Screens a candidate patch against the current text and returns a
//! [`ConflictReport`]. Conflicts are data, never errors.

pub mod analyzer;
pub mod heuristics;
pub mod model;

pub use analyzer::{analyze_conflicts, ConflictAnalyzer};
pub use heuristics::{check_brackets, BracketIssue};
pub use model::{
    ConflictReport, Finding, FindingCategory, RecommendedAction, Resolution, ResolutionAction,
    Severity,
};
