//! Revlex Store - SQLite persistence for the snapshot ledger
//!
//! Provides:
//! - SQLite schema with an embedded, checksum-verified migrations framework
//! - `SqliteLedgerStore`, an implementation of `revlex_core::ledger::LedgerStore`

pub mod db;
pub mod errors;
pub mod ledger;
pub mod migrations;

// Re-export key types
pub use errors::Result;
pub use ledger::SqliteLedgerStore;
