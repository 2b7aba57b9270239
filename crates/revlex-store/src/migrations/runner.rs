//! Migration runner
//!
//! Applies migrations in order inside one transaction each, records their
//! checksums, and refuses to run against a database whose recorded checksum
//! differs from the embedded SQL.

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::catalog::{Migration, LEDGER_MIGRATIONS};
use rusqlite::{Connection, OptionalExtension};

/// Apply all pending migrations to the database
///
/// # Errors
///
/// `Persistence` if a migration fails, `IntegrityMismatch` if an applied
/// migration's checksum no longer matches.
pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    create_schema_version_table(conn)?;

    LEDGER_MIGRATIONS
        .iter()
        .try_for_each(|migration| apply_migration(conn, migration))
}

/// Ids of applied migrations in application order
///
/// # Errors
///
/// `Persistence` on query failure.
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT migration_id FROM schema_version ORDER BY id")
        .map_err(from_rusqlite)?;
    let ids = stmt
        .query_map([], |row| row.get(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(from_rusqlite)?;
    Ok(ids)
}

fn create_schema_version_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL,
            checksum TEXT
        )",
        [],
    )
    .map_err(from_rusqlite)?;

    Ok(())
}

/// No-op when already recorded with a matching checksum
fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<()> {
    let migration_id = migration.id;
    let checksum = migration.checksum();

    let recorded: Option<Option<String>> = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?",
            [migration_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    if let Some(recorded) = recorded {
        return match recorded {
            Some(stored) if stored != checksum => {
                Err(checksum_mismatch(migration_id, &stored, &checksum))
            }
            _ => Ok(()),
        };
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;

    tx.execute_batch(migration.sql)
        .map_err(|e| migration_error(migration_id, &e.to_string()))?;

    let now = chrono::Utc::now().timestamp();
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?, ?, ?)",
        rusqlite::params![migration_id, now, checksum],
    )
    .map_err(from_rusqlite)?;

    tx.commit().map_err(from_rusqlite)?;

    tracing::debug!(component = "migrations", migration_id, "migration applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_run_records_nothing_new() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        apply_migrations(&mut conn).unwrap();
        assert_eq!(applied_migrations(&conn).unwrap().len(), LEDGER_MIGRATIONS.len());
    }
}
