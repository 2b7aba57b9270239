//! Diff codec.
//!
//! Computes and replays deltas between two text blobs in two forms:
//!
//! - [`LineDelta`]: only changed lines, typed `add`/`delete`/`modify`, keyed
//!   by a 1-based line number that means the same thing on diff and apply.
//!   Unchanged lines are never stored.
//! - [`UnifiedDelta`]: textual unified-diff hunks for interoperability.
//!
//! ## Entry point
//!
//! ```
//! use revlex_core::diff::{apply_delta, compute_delta, Delta};
//!
//! let delta = compute_delta("a\nb\nc", "a\nb\nc\nd");
//! assert_eq!(delta.unified_delta.hunks[0].header(), "@@ -1,3 +1,4 @@");
//! let after = apply_delta("a\nb\nc", &Delta::Line(delta.line_delta)).unwrap();
//! assert_eq!(after, "a\nb\nc\nd");
//! ```
//!
//! All functions here are pure and safe for unlimited concurrent use.

pub mod engine;
pub mod human_summary;
pub mod model;
pub mod unified;

pub use engine::{apply_delta, apply_line_delta, compute_delta, delta_stats, diff_lines};
pub use human_summary::render_human_summary;
pub use model::{
    ComputedDelta, Delta, DeltaStats, Hunk, HunkLine, LineChange, LineChangeKind, LineDelta,
    UnifiedDelta,
};
pub use unified::{apply_unified_delta, parse_unified, unified_delta, unified_delta_with};
