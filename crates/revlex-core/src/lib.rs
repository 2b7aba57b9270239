//! Revlex Core - versioned text customization kernel
//!
//! This crate provides the pure, synchronous building blocks of the engine:
//! - Line model and SHA-256 content hashing
//! - Diff codec: position-aligned line deltas and unified-diff hunks
//! - Patch model: validation, all-or-nothing application, re-diffed inverses
//! - Conflict analyzer with pluggable symbol extraction
//! - Customization, Snapshot and RollbackRecord models
//! - Snapshot ledger over an injected storage trait, with an in-memory store
//! - Error and structured logging facilities shared by the other crates
//!
//! Diff, patch and conflict functions are stateless and safe to call from
//! any number of threads.

pub mod conflict;
pub mod diff;
pub mod document;
pub mod errors;
pub mod ledger;
pub mod logging_facility;
pub mod model;
pub mod patch;
pub mod symbols;

pub use revlex_core_types as core_types;

// Re-export commonly used types
pub use conflict::{analyze_conflicts, ConflictAnalyzer, ConflictReport, Severity};
pub use diff::{apply_delta, compute_delta, ComputedDelta, Delta};
pub use document::content_hash;
pub use errors::{ExError, ExErrorKind, PatchFailure, Result, RevlexError};
pub use ledger::{LedgerBatch, LedgerStore, MemoryLedgerStore, SnapshotDraft, SnapshotLedger};
pub use model::{
    ChangeKind, ChangeMeta, Customization, CustomizationStatus, Lifecycle, RollbackKind,
    RollbackRecord, Snapshot,
};
pub use patch::{Patch, PatchOp};
