//! Schema migrations for the ledger database.
//!
//! Each step runs once, in its own transaction, and its checksum is kept so
//! a reopened database can be checked against the SQL this build embeds.

mod catalog;
mod runner;

pub use catalog::{Migration, LEDGER_MIGRATIONS};
pub use runner::{applied_migrations, apply_migrations};
