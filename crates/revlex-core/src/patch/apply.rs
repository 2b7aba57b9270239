//! Patch application.
//!
//! ## Atomicity Contract
//!
//! - **All-or-nothing**: operations run in list order on a copy of the
//!   document; the caller only ever sees the fully patched text or an error.
//! - **No panics**: out-of-range addresses and failed `test` ops return
//!   `PatchApplication` with the index of the failing operation.
//! - **Validated first**: a structurally invalid patch is rejected with
//!   `MalformedPatch` before any operation runs.
//!
//! ## Example
//!
//! ```
//! use revlex_core::patch::{apply, Patch, PatchOp};
//!
//! let patch = Patch::new(vec![PatchOp::replace(1, "B"), PatchOp::append("d")]);
//! assert_eq!(apply(&patch, "a\nb\nc").unwrap(), "a\nB\nc\nd");
//! ```

use crate::document::{join_lines, split_lines};
use crate::errors::{PatchFailure, Result, RevlexError};
use crate::patch::model::{Patch, PatchOp};
use crate::patch::validate::{resolve, LineAddress, ResolvedOp};

fn check_index(index: usize, len: usize) -> std::result::Result<(), PatchFailure> {
    if index < len {
        Ok(())
    } else {
        Err(PatchFailure::IndexOutOfRange { index, len })
    }
}

fn check_insertion(index: usize, len: usize) -> std::result::Result<(), PatchFailure> {
    if index <= len {
        Ok(())
    } else {
        Err(PatchFailure::IndexOutOfRange { index, len })
    }
}

/// Execute one resolved operation against `lines`.
///
/// On failure `lines` is left untouched.
pub(crate) fn step(lines: &mut Vec<String>, op: &ResolvedOp<'_>) -> std::result::Result<(), PatchFailure> {
    match *op {
        ResolvedOp::Add { at, value } => {
            let index = at.resolve(lines.len());
            check_insertion(index, lines.len())?;
            lines.insert(index, value.to_string());
        }
        ResolvedOp::Remove { at } => {
            check_index(at, lines.len())?;
            lines.remove(at);
        }
        ResolvedOp::Replace { at, value } => {
            check_index(at, lines.len())?;
            lines[at] = value.to_string();
        }
        ResolvedOp::Move { from, to } => {
            check_index(from, lines.len())?;
            let dest = to.resolve(lines.len());
            check_insertion(dest, lines.len())?;
            let line = lines.remove(from);
            let dest = if dest > from { dest - 1 } else { dest };
            lines.insert(dest, line);
        }
        ResolvedOp::Copy { from, to } => {
            check_index(from, lines.len())?;
            let dest = to.resolve(lines.len());
            check_insertion(dest, lines.len())?;
            let line = lines[from].clone();
            lines.insert(dest, line);
        }
        ResolvedOp::Test { at, value } => {
            check_index(at, lines.len())?;
            if lines[at] != value {
                return Err(PatchFailure::TestFailed {
                    index: at,
                    expected: value.to_string(),
                    actual: lines[at].clone(),
                });
            }
        }
    }
    Ok(())
}

/// Apply a patch to a document given as lines
///
/// # Errors
///
/// - `MalformedPatch` if validation fails
/// - `PatchApplication` with `failed_op_index` if an operation does not fit
pub fn apply_to_lines(patch: &Patch, lines: &[String]) -> Result<Vec<String>> {
    let ops = resolve(patch)?;
    let mut buffer = lines.to_vec();
    for (i, op) in ops.iter().enumerate() {
        step(&mut buffer, op).map_err(|reason| RevlexError::PatchApplication {
            failed_op_index: i,
            reason,
        })?;
    }
    Ok(buffer)
}

/// Apply a patch to text, returning the patched text
///
/// # Errors
///
/// - `MalformedPatch` if validation fails
/// - `PatchApplication` with `failed_op_index` if an operation does not fit
pub fn apply(patch: &Patch, text: &str) -> Result<String> {
    let lines = apply_to_lines(patch, &split_lines(text))?;
    Ok(join_lines(&lines))
}

/// Rewrite `patch` so that it only applies to text that still lines up with
/// `base`, the document it was recorded against.
///
/// Every operation is preceded by `test` ops pinning the lines it reads or
/// inserts next to, with the content those lines held while the patch ran
/// on `base`. Replaying the result on a shifted document fails with
/// `PatchFailure::TestFailed` instead of editing the wrong line.
///
/// # Errors
///
/// The same errors as [`apply`] when `patch` does not apply to `base`.
pub fn anchor(patch: &Patch, base: &str) -> Result<Patch> {
    let ops = resolve(patch)?;
    let mut lines = split_lines(base);
    let mut anchored = Vec::with_capacity(patch.len() * 2);
    for (i, (op, raw)) in ops.iter().zip(patch.iter()).enumerate() {
        match *op {
            ResolvedOp::Remove { at } | ResolvedOp::Replace { at, .. } => {
                pin(&mut anchored, &lines, at);
            }
            ResolvedOp::Move { from, to } | ResolvedOp::Copy { from, to } => {
                pin(&mut anchored, &lines, from);
                pin_insertion(&mut anchored, &lines, to);
            }
            ResolvedOp::Add { at, .. } => pin_insertion(&mut anchored, &lines, at),
            ResolvedOp::Test { .. } => {}
        }
        step(&mut lines, op).map_err(|reason| RevlexError::PatchApplication {
            failed_op_index: i,
            reason,
        })?;
        anchored.push(raw.clone());
    }
    Ok(Patch::new(anchored))
}

fn pin(anchored: &mut Vec<PatchOp>, lines: &[String], index: usize) {
    if let Some(line) = lines.get(index) {
        anchored.push(PatchOp::test(index, line.clone()));
    }
}

/// Pin both neighbours of an insertion point
fn pin_insertion(anchored: &mut Vec<PatchOp>, lines: &[String], at: LineAddress) {
    let index = at.resolve(lines.len());
    if index > 0 {
        pin(anchored, lines, index - 1);
    }
    pin(anchored, lines, index);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_out_of_range() {
        let patch = Patch::new(vec![PatchOp::remove(5)]);
        let err = apply(&patch, "a\nb\nc").unwrap_err();
        assert_eq!(
            err,
            RevlexError::PatchApplication {
                failed_op_index: 0,
                reason: PatchFailure::IndexOutOfRange { index: 5, len: 3 },
            }
        );
    }

    #[test]
    fn test_ops_shift_later_indices() {
        // Second remove sees the document after the first.
        let patch = Patch::new(vec![PatchOp::remove(0), PatchOp::remove(0)]);
        assert_eq!(apply(&patch, "a\nb\nc").unwrap(), "c");
    }

    #[test]
    fn test_add_at_length_appends() {
        let patch = Patch::new(vec![PatchOp::add(2, "c")]);
        assert_eq!(apply(&patch, "a\nb").unwrap(), "a\nb\nc");
        let patch = Patch::new(vec![PatchOp::add(3, "c")]);
        assert!(apply(&patch, "a\nb").is_err());
    }

    #[test]
    fn test_add_to_empty_document() {
        let patch = Patch::new(vec![PatchOp::append("x")]);
        assert_eq!(apply(&patch, "").unwrap(), "x");
    }

    #[test]
    fn test_move_forward_adjusts_destination() {
        // Line 0 lands before the old line 3, i.e. after "c".
        let patch = Patch::new(vec![PatchOp::move_line(0, 3)]);
        assert_eq!(apply(&patch, "a\nb\nc\nd").unwrap(), "b\nc\na\nd");
    }

    #[test]
    fn test_move_backward() {
        let patch = Patch::new(vec![PatchOp::move_line(3, 0)]);
        assert_eq!(apply(&patch, "a\nb\nc\nd").unwrap(), "d\na\nb\nc");
    }

    #[test]
    fn test_move_to_end() {
        let patch = Patch::new(vec![PatchOp {
            op: crate::patch::model::OpKind::Move,
            path: "/lines/-".to_string(),
            value: None,
            from: Some("/lines/0".to_string()),
        }]);
        assert_eq!(apply(&patch, "a\nb\nc").unwrap(), "b\nc\na");
    }

    #[test]
    fn test_copy() {
        let patch = Patch::new(vec![PatchOp::copy_line(0, 2)]);
        assert_eq!(apply(&patch, "a\nb").unwrap(), "a\nb\na");
    }

    #[test]
    fn test_failed_test_aborts_whole_patch() {
        let patch = Patch::new(vec![
            PatchOp::replace(0, "changed"),
            PatchOp::test(1, "nope"),
        ]);
        let err = apply(&patch, "a\nb").unwrap_err();
        assert!(matches!(
            err,
            RevlexError::PatchApplication {
                failed_op_index: 1,
                reason: PatchFailure::TestFailed { .. }
            }
        ));
    }

    #[test]
    fn test_malformed_is_rejected_before_apply() {
        let patch = Patch::new(vec![PatchOp::append("ok"), PatchOp::add(0, "two\nlines")]);
        assert!(matches!(
            apply(&patch, "a"),
            Err(RevlexError::MalformedPatch { op_index: 1, .. })
        ));
    }

    #[test]
    fn test_anchor_applies_to_its_base() {
        let patch = Patch::new(vec![PatchOp::replace(1, "B"), PatchOp::append("d")]);
        let anchored = anchor(&patch, "a\nb\nc").unwrap();
        assert_eq!(anchored.ops[0], PatchOp::test(1, "b"));
        assert_eq!(apply(&anchored, "a\nb\nc").unwrap(), "a\nB\nc\nd");
    }

    #[test]
    fn test_anchor_rejects_shifted_text() {
        // Replacing "b" must not land on "c" once a line above is gone
        let anchored = anchor(&Patch::new(vec![PatchOp::replace(2, "B")]), "a\nX\nb\nc").unwrap();
        let err = apply(&anchored, "a\nb\nc").unwrap_err();
        assert!(matches!(
            err,
            RevlexError::PatchApplication {
                reason: PatchFailure::TestFailed { index: 2, .. },
                ..
            }
        ));
    }
}
