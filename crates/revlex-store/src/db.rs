//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for another connection's lock before failing
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a SQLite database at the given path
///
/// # Errors
///
/// `Persistence` if the file cannot be opened.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
///
/// # Errors
///
/// `Persistence` if SQLite cannot allocate the database.
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection: foreign keys, WAL journal, busy timeout
///
/// # Errors
///
/// `Persistence` if a pragma fails.
pub fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(from_rusqlite)?;

    // journal_mode reports the resulting mode as a row; in-memory databases stay "memory".
    let _mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .map_err(from_rusqlite)?;

    conn.busy_timeout(BUSY_TIMEOUT).map_err(from_rusqlite)?;

    Ok(())
}
