//! Structural validation of patches.
//!
//! Validation never looks at a document. It checks that every path parses,
//! that required `value`/`from` fields are present and that values are single
//! lines. Range checks need the document and happen during apply.

use crate::errors::{Result, RevlexError};
use crate::patch::model::{OpKind, Patch, PatchOp, APPEND_PATH, LINES_PREFIX};

/// Parsed line address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAddress {
    Index(usize),
    End,
}

impl LineAddress {
    /// Concrete insertion index for a document of `len` lines
    pub fn resolve(self, len: usize) -> usize {
        match self {
            LineAddress::Index(i) => i,
            LineAddress::End => len,
        }
    }

    pub fn index(self) -> Option<usize> {
        match self {
            LineAddress::Index(i) => Some(i),
            LineAddress::End => None,
        }
    }
}

/// An operation with its paths parsed and required fields unwrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedOp<'a> {
    Add { at: LineAddress, value: &'a str },
    Remove { at: usize },
    Replace { at: usize, value: &'a str },
    Move { from: usize, to: LineAddress },
    Copy { from: usize, to: LineAddress },
    Test { at: usize, value: &'a str },
}

fn malformed(op_index: usize, reason: impl Into<String>) -> RevlexError {
    RevlexError::MalformedPatch {
        op_index,
        reason: reason.into(),
    }
}

fn parse_address(path: &str, allow_end: bool, op_index: usize) -> Result<LineAddress> {
    if path == APPEND_PATH {
        if allow_end {
            return Ok(LineAddress::End);
        }
        return Err(malformed(op_index, "'-' is only valid as an insertion point"));
    }
    let rest = path
        .strip_prefix(LINES_PREFIX)
        .ok_or_else(|| malformed(op_index, format!("path {:?} must start with /lines/", path)))?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(op_index, format!("path {:?} has no line index", path)));
    }
    if rest.len() > 1 && rest.starts_with('0') {
        return Err(malformed(op_index, format!("path {:?} has a leading zero", path)));
    }
    rest.parse::<usize>()
        .map(LineAddress::Index)
        .map_err(|_| malformed(op_index, format!("path {:?} index overflows", path)))
}

fn parse_index(path: &str, op_index: usize) -> Result<usize> {
    match parse_address(path, false, op_index)? {
        LineAddress::Index(i) => Ok(i),
        LineAddress::End => Err(malformed(op_index, "'-' is only valid as an insertion point")),
    }
}

fn required_value(op: &PatchOp, op_index: usize) -> Result<&str> {
    let value = op
        .value
        .as_deref()
        .ok_or_else(|| malformed(op_index, format!("{} requires a value", op.op.as_str())))?;
    if value.contains('\n') {
        return Err(malformed(op_index, "value must be a single line"));
    }
    Ok(value)
}

fn required_from(op: &PatchOp, op_index: usize) -> Result<usize> {
    let from = op
        .from
        .as_deref()
        .ok_or_else(|| malformed(op_index, format!("{} requires from", op.op.as_str())))?;
    parse_index(from, op_index)
}

/// Parse one operation
///
/// # Errors
///
/// Returns `RevlexError::MalformedPatch` carrying `op_index`.
pub fn resolve_op(op: &PatchOp, op_index: usize) -> Result<ResolvedOp<'_>> {
    Ok(match op.op {
        OpKind::Add => ResolvedOp::Add {
            at: parse_address(&op.path, true, op_index)?,
            value: required_value(op, op_index)?,
        },
        OpKind::Remove => ResolvedOp::Remove {
            at: parse_index(&op.path, op_index)?,
        },
        OpKind::Replace => ResolvedOp::Replace {
            at: parse_index(&op.path, op_index)?,
            value: required_value(op, op_index)?,
        },
        OpKind::Move => ResolvedOp::Move {
            from: required_from(op, op_index)?,
            to: parse_address(&op.path, true, op_index)?,
        },
        OpKind::Copy => ResolvedOp::Copy {
            from: required_from(op, op_index)?,
            to: parse_address(&op.path, true, op_index)?,
        },
        OpKind::Test => ResolvedOp::Test {
            at: parse_index(&op.path, op_index)?,
            value: required_value(op, op_index)?,
        },
    })
}

/// Parse every operation, stopping at the first malformed one
///
/// # Errors
///
/// Returns `RevlexError::MalformedPatch` for the first invalid operation.
pub fn resolve(patch: &Patch) -> Result<Vec<ResolvedOp<'_>>> {
    patch
        .iter()
        .enumerate()
        .map(|(i, op)| resolve_op(op, i))
        .collect()
}

/// Check a patch for structural validity
///
/// # Errors
///
/// Returns `RevlexError::MalformedPatch` for the first invalid operation.
pub fn validate(patch: &Patch) -> Result<()> {
    resolve(patch).map(|_| ())
}
