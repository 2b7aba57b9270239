//! Patch model.
//!
//! A [`Patch`] is an ordered list of line operations
//! (`add`, `remove`, `replace`, `move`, `copy`, `test`) that replays
//! deterministically against a document. See [`apply`] for the execution
//! contract and [`invert`] for how inverses are produced.

pub mod apply;
pub mod invert;
pub mod model;
pub mod validate;

pub use apply::{anchor, apply, apply_to_lines};
pub use invert::{compose, diff_patch, diff_patch_lines, invert};
pub use model::{line_path, OpKind, Patch, PatchOp, APPEND_PATH, LINES_PREFIX};
pub use validate::{resolve, resolve_op, validate, LineAddress, ResolvedOp};
