//! Patch generation, inversion and composition.
//!
//! Inverses are never derived op-by-op: `move` and `copy` have no closed-form
//! inverse without the full document. Instead the inverse is recomputed by
//! diffing the known endpoints, which is always correct.

use crate::diff::engine::diff_line_slices;
use crate::diff::model::LineChangeKind;
use crate::document::split_lines;
use crate::patch::model::{Patch, PatchOp};

/// Patch that turns the `before` lines into the `after` lines.
///
/// Built from the position-aligned line delta: `replace` for every modified
/// line, then tail `remove`s from the highest index down, then `add`s in
/// ascending order. Every op addresses a distinct line.
pub fn diff_patch_lines(before: &[String], after: &[String]) -> Patch {
    let delta = diff_line_slices(before, after);
    let mut ops = Vec::with_capacity(delta.changes.len());

    for change in &delta.changes {
        if change.kind == LineChangeKind::Modify {
            ops.push(PatchOp::replace(
                change.line - 1,
                change.new_content.clone().unwrap_or_default(),
            ));
        }
    }

    let mut removed: Vec<usize> = delta
        .changes
        .iter()
        .filter(|c| c.kind == LineChangeKind::Delete)
        .map(|c| c.line - 1)
        .collect();
    removed.sort_unstable_by(|a, b| b.cmp(a));
    ops.extend(removed.into_iter().map(PatchOp::remove));

    for change in &delta.changes {
        if change.kind == LineChangeKind::Add {
            ops.push(PatchOp::add(
                change.line - 1,
                change.new_content.clone().unwrap_or_default(),
            ));
        }
    }

    Patch::new(ops)
}

/// Patch that turns `before` into `after`
pub fn diff_patch(before: &str, after: &str) -> Patch {
    diff_patch_lines(&split_lines(before), &split_lines(after))
}

/// Patch that turns `after` back into `before`
pub fn invert(before: &str, after: &str) -> Patch {
    diff_patch(after, before)
}

/// Sequential composition: applying the result equals applying each patch in turn
pub fn compose(patches: &[Patch]) -> Patch {
    Patch::new(
        patches
            .iter()
            .flat_map(|p| p.ops.iter().cloned())
            .collect(),
    )
}
