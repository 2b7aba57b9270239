//! Patch operation types.
//!
//! A patch is an ordered list of line operations. Paths address a 0-based
//! line index as `/lines/<n>`; `add`, `copy` and `move` destinations also
//! accept `/lines/-` (append).

use serde::{Deserialize, Serialize};

/// Prefix of every line path
pub const LINES_PREFIX: &str = "/lines/";

/// Destination path meaning "after the last line"
pub const APPEND_PATH: &str = "/lines/-";

/// Build the path of a 0-based line index
pub fn line_path(index: usize) -> String {
    format!("{}{}", LINES_PREFIX, index)
}

/// Operation kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::Replace => "replace",
            OpKind::Move => "move",
            OpKind::Copy => "copy",
            OpKind::Test => "test",
        }
    }

    /// Whether the op changes the document
    pub fn is_mutating(&self) -> bool {
        !matches!(self, OpKind::Test)
    }
}

/// A single patch operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatchOp {
    pub op: OpKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl PatchOp {
    fn new(op: OpKind, path: String, value: Option<String>, from: Option<String>) -> Self {
        Self {
            op,
            path,
            value,
            from,
        }
    }

    /// Insert `value` before line `index` (`index == len` appends)
    pub fn add(index: usize, value: impl Into<String>) -> Self {
        Self::new(OpKind::Add, line_path(index), Some(value.into()), None)
    }

    /// Append `value` after the last line
    pub fn append(value: impl Into<String>) -> Self {
        Self::new(OpKind::Add, APPEND_PATH.to_string(), Some(value.into()), None)
    }

    pub fn remove(index: usize) -> Self {
        Self::new(OpKind::Remove, line_path(index), None, None)
    }

    pub fn replace(index: usize, value: impl Into<String>) -> Self {
        Self::new(OpKind::Replace, line_path(index), Some(value.into()), None)
    }

    /// Move line `from` so it lands before line `to` of the pre-move document
    pub fn move_line(from: usize, to: usize) -> Self {
        Self::new(OpKind::Move, line_path(to), None, Some(line_path(from)))
    }

    pub fn copy_line(from: usize, to: usize) -> Self {
        Self::new(OpKind::Copy, line_path(to), None, Some(line_path(from)))
    }

    /// Assert that line `index` equals `value`
    pub fn test(index: usize, value: impl Into<String>) -> Self {
        Self::new(OpKind::Test, line_path(index), Some(value.into()), None)
    }
}

/// Ordered list of operations, serialised as a bare JSON array
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Patch {
    pub ops: Vec<PatchOp>,
}

impl Patch {
    pub fn new(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PatchOp> {
        self.ops.iter()
    }

    /// Parse a patch from its JSON array form
    ///
    /// # Errors
    ///
    /// Returns `RevlexError::Serialization` if the JSON is not a list of ops.
    pub fn from_json(json: &str) -> crate::errors::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::errors::RevlexError::Serialization {
            message: format!("invalid patch JSON: {}", e),
        })
    }

    /// Serialise to the JSON array form
    ///
    /// # Errors
    ///
    /// Returns `RevlexError::Serialization` if serialisation fails.
    pub fn to_json(&self) -> crate::errors::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::errors::RevlexError::Serialization {
            message: e.to_string(),
        })
    }
}

impl From<Vec<PatchOp>> for Patch {
    fn from(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a PatchOp;
    type IntoIter = std::slice::Iter<'a, PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_serialises_as_array() {
        let patch = Patch::new(vec![PatchOp::remove(5), PatchOp::append("x")]);
        let json = patch.to_json().unwrap();
        assert_eq!(
            json,
            r#"[{"op":"remove","path":"/lines/5"},{"op":"add","path":"/lines/-","value":"x"}]"#
        );
        assert_eq!(Patch::from_json(&json).unwrap(), patch);
    }

    #[test]
    fn test_move_carries_from() {
        let op = PatchOp::move_line(0, 3);
        assert_eq!(op.from.as_deref(), Some("/lines/0"));
        assert_eq!(op.path, "/lines/3");
    }

    #[test]
    fn test_from_json_rejects_unknown_op() {
        let err = Patch::from_json(r#"[{"op":"frobnicate","path":"/lines/0"}]"#).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::RevlexError::Serialization { .. }
        ));
    }
}
