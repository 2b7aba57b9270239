//! Error handling for revlex-store
//!
//! Wraps revlex-core ExError with store-specific helpers

use revlex_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::IntegrityMismatch)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a database error from rusqlite::Error
///
/// Only key collisions (the `(customization_id, sequence)` unique key or a
/// duplicate primary key) and lock contention map to `Concurrency`, which the
/// engine retries. Foreign key, CHECK and NOT NULL failures are `Persistence`.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(e, _) if is_key_collision(e) => ExErrorKind::Concurrency,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) =>
        {
            ExErrorKind::Concurrency
        }
        _ => ExErrorKind::Persistence,
    };
    ExError::new(kind).with_op("sqlite").with_message(err.to_string())
}

fn is_key_collision(e: &rusqlite::ffi::Error) -> bool {
    e.code == rusqlite::ErrorCode::ConstraintViolation
        && matches!(
            e.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
}

/// A stored value could not be decoded
pub fn corrupt_row(table: &str, column: &str, value: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("decode_row")
        .with_message(format!("{}.{} holds unreadable value {:?}", table, column, value))
}

/// JSON (de)serialization of a stored column failed
pub fn serialization_error(column: &str, err: serde_json::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("sqlite")
        .with_message(format!("{}: {}", column, err))
}

/// The connection mutex was poisoned by a panicking writer
pub fn lock_poisoned() -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("sqlite")
        .with_message("connection lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_is_concurrency() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k INTEGER UNIQUE); INSERT INTO t VALUES (1);")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES (1)", []).unwrap_err();
        assert_eq!(from_rusqlite(err).kind(), ExErrorKind::Concurrency);
    }

    #[test]
    fn test_duplicate_primary_key_is_concurrency() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id TEXT PRIMARY KEY); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();
        assert_eq!(from_rusqlite(err).kind(), ExErrorKind::Concurrency);
    }

    #[test]
    fn test_foreign_key_violation_is_not_retryable() {
        // GIVEN a child table referencing a parent, with enforcement on
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id TEXT PRIMARY KEY);
             CREATE TABLE child (parent_id TEXT NOT NULL REFERENCES parent(id));",
        )
        .unwrap();

        // WHEN a child points at a missing parent
        let err = conn
            .execute("INSERT INTO child VALUES ('missing')", [])
            .unwrap_err();

        // THEN the failure is a persistence error, not a race
        let ex = from_rusqlite(err);
        assert_eq!(ex.kind(), ExErrorKind::Persistence);
        assert!(!ex.kind().is_retryable());
    }

    #[test]
    fn test_check_and_not_null_violations_are_persistence() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (n INTEGER NOT NULL CHECK (n >= 1));")
            .unwrap();
        let check = conn.execute("INSERT INTO t VALUES (0)", []).unwrap_err();
        let not_null = conn.execute("INSERT INTO t VALUES (NULL)", []).unwrap_err();
        assert_eq!(from_rusqlite(check).kind(), ExErrorKind::Persistence);
        assert_eq!(from_rusqlite(not_null).kind(), ExErrorKind::Persistence);
    }

    #[test]
    fn test_other_errors_are_persistence() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = conn.execute("INSERT INTO missing VALUES (1)", []).unwrap_err();
        assert_eq!(from_rusqlite(err).kind(), ExErrorKind::Persistence);
    }
}
