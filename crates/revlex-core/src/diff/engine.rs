//! Line delta computation and replay.
//!
//! The scan is position-aligned rather than LCS-based: both texts are walked
//! by index and every differing index yields one change. When one side runs
//! out, the remainder is emitted as pure additions or deletions. This is O(n)
//! but a single early insertion shifts every later line and shows up as a
//! run of `modify` entries followed by one `add`, instead of one clean
//! insertion. Callers that need better fidelity can swap in an O(ND)
//! algorithm behind [`compute_delta`] without changing its contract.

use crate::diff::model::{
    ComputedDelta, Delta, DeltaStats, LineChange, LineChangeKind, LineDelta,
};
use crate::diff::unified::{apply_unified_delta, unified_delta};
use crate::document::{join_lines, split_lines};
use crate::errors::{Result, RevlexError};

/// Compute the position-aligned line delta from `before` to `after`
pub fn diff_lines(before: &str, after: &str) -> LineDelta {
    let old = split_lines(before);
    let new = split_lines(after);
    diff_line_slices(&old, &new)
}

pub(crate) fn diff_line_slices(old: &[String], new: &[String]) -> LineDelta {
    let mut changes = Vec::new();
    let shared = old.len().min(new.len());

    for i in 0..shared {
        if old[i] != new[i] {
            changes.push(LineChange::modify(i + 1, old[i].clone(), new[i].clone()));
        }
    }
    for (i, line) in new.iter().enumerate().skip(shared) {
        changes.push(LineChange::add(i + 1, line.clone()));
    }
    for (i, line) in old.iter().enumerate().skip(shared) {
        changes.push(LineChange::delete(i + 1, line.clone()));
    }

    LineDelta {
        changes,
        old_line_count: old.len(),
        new_line_count: new.len(),
    }
}

fn delta_error(line: usize, reason: impl Into<String>) -> RevlexError {
    RevlexError::DeltaApplication {
        line,
        reason: reason.into(),
    }
}

fn expect_content(change: &LineChange, actual: &str) -> Result<()> {
    if let Some(expected) = &change.old_content {
        if expected != actual {
            return Err(delta_error(
                change.line,
                format!("expected {:?}, found {:?}", expected, actual),
            ));
        }
    }
    Ok(())
}

/// Replay a line delta against `before`.
///
/// The base must have exactly `old_line_count` lines and every recorded old
/// line must match, otherwise the delta was computed against a different
/// text and `DeltaApplication` is returned.
///
/// # Errors
///
/// Returns `RevlexError::DeltaApplication` when the delta does not fit `before`.
pub fn apply_line_delta(before: &str, delta: &LineDelta) -> Result<String> {
    let mut lines = split_lines(before);
    if lines.len() != delta.old_line_count {
        return Err(delta_error(
            0,
            format!(
                "base has {} lines but delta expects {}",
                lines.len(),
                delta.old_line_count
            ),
        ));
    }

    let mut deletes: Vec<usize> = Vec::new();
    let mut adds: Vec<&LineChange> = Vec::new();

    for change in &delta.changes {
        let idx = change
            .line
            .checked_sub(1)
            .ok_or_else(|| delta_error(0, "line numbers are 1-based"))?;
        match change.kind {
            LineChangeKind::Modify => {
                let current = lines
                    .get(idx)
                    .ok_or_else(|| delta_error(change.line, "modify past end of text"))?;
                expect_content(change, current)?;
                let replacement = change
                    .new_content
                    .clone()
                    .ok_or_else(|| delta_error(change.line, "modify without new content"))?;
                lines[idx] = replacement;
            }
            LineChangeKind::Delete => {
                let current = lines
                    .get(idx)
                    .ok_or_else(|| delta_error(change.line, "delete past end of text"))?;
                expect_content(change, current)?;
                deletes.push(idx);
            }
            LineChangeKind::Add => {
                if change.new_content.is_none() {
                    return Err(delta_error(change.line, "add without content"));
                }
                adds.push(change);
            }
        }
    }

    // Deletions are always the tail of the old text.
    deletes.sort_unstable();
    deletes.dedup();
    if let Some(&first) = deletes.first() {
        if first + deletes.len() != lines.len()
            || deletes.iter().enumerate().any(|(k, &d)| d != first + k)
        {
            return Err(delta_error(first + 1, "deletions do not form the tail"));
        }
        lines.truncate(first);
    }

    adds.sort_by_key(|c| c.line);
    for change in adds {
        if change.line != lines.len() + 1 {
            return Err(delta_error(
                change.line,
                format!("add expected at line {}", lines.len() + 1),
            ));
        }
        lines.push(change.new_content.clone().unwrap_or_default());
    }

    if lines.len() != delta.new_line_count {
        return Err(delta_error(
            lines.len(),
            format!(
                "result has {} lines but delta expects {}",
                lines.len(),
                delta.new_line_count
            ),
        ));
    }

    Ok(join_lines(&lines))
}

/// Size/change statistics for a line delta
pub fn delta_stats(before: &str, after: &str, delta: &LineDelta) -> DeltaStats {
    let additions = delta.count(LineChangeKind::Add);
    let deletions = delta.count(LineChangeKind::Delete);
    let modifications = delta.count(LineChangeKind::Modify);
    let unchanged = delta
        .old_line_count
        .min(delta.new_line_count)
        .saturating_sub(modifications);

    let stored_bytes: usize = delta
        .changes
        .iter()
        .map(|c| {
            c.old_content.as_ref().map_or(0, String::len)
                + c.new_content.as_ref().map_or(0, String::len)
        })
        .sum();
    let full_bytes = before.len() + after.len();
    let savings_ratio = if full_bytes == 0 {
        0.0
    } else {
        (1.0 - stored_bytes as f64 / full_bytes as f64).max(0.0)
    };

    DeltaStats {
        additions,
        deletions,
        modifications,
        unchanged,
        old_line_count: delta.old_line_count,
        new_line_count: delta.new_line_count,
        stored_bytes,
        full_bytes,
        savings_ratio,
    }
}

/// Compute the line delta, unified delta and statistics in one call
pub fn compute_delta(before: &str, after: &str) -> ComputedDelta {
    let line_delta = diff_lines(before, after);
    let stats = delta_stats(before, after, &line_delta);
    ComputedDelta {
        unified_delta: unified_delta(before, after),
        line_delta,
        stats,
    }
}

/// Replay either form of delta against `before`
///
/// # Errors
///
/// Returns `RevlexError::DeltaApplication` if the delta does not fit `before`.
pub fn apply_delta(before: &str, delta: &Delta) -> Result<String> {
    match delta {
        Delta::Line(d) => apply_line_delta(before, d),
        Delta::Unified(d) => apply_unified_delta(before, d),
    }
}
