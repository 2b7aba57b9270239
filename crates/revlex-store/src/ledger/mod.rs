//! SQLite-backed ledger store

mod rows;
mod sqlite_ledger;

pub use sqlite_ledger::SqliteLedgerStore;
