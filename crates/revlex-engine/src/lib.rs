//! Revlex Engine - Version Controller
//!
//! Orchestrates the pure components of `revlex-core` over an injected
//! `LedgerStore`:
//!
//! - create / apply / finalize with one open snapshot per customization
//! - patch-driven edits gated by the conflict analyzer
//! - rollback (in-place, branch, selective) and cherry-pick
//! - reconstruction and integrity verification from stored deltas
//! - background janitor for abandoned work
//!
//! Every mutating call runs inside a per-customization critical section and
//! commits one atomic `LedgerBatch`; `Concurrency` failures are retried with
//! fresh state up to `EngineConfig::max_commit_retries` times.

pub mod commands;
pub mod config;
pub mod controller;
pub mod janitor;
pub mod outcome;

use revlex_core::errors::ExError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, ExError>;

pub use commands::engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use config::EngineConfig;
pub use controller::{
    ChangeOutcome, CherryPickResult, IntegrityReport, JanitorReport, RollbackMode,
    RollbackRequest, RollbackResult, VersionController,
};
pub use janitor::{Janitor, JanitorHandle};
pub use outcome::Outcome;
