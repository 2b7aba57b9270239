// Integration tests for the migration framework

use revlex_core::errors::ExErrorKind;
use revlex_store::migrations::{applied_migrations, apply_migrations};
use rusqlite::Connection;

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    // Given: An empty SQLite database
    let mut conn = setup_test_db();

    // When: Migrations are applied
    let result = apply_migrations(&mut conn);

    // Then: All migrations succeed and every ledger table exists
    assert!(result.is_ok(), "Migrations should succeed: {:?}", result.err());
    let tables = get_table_names(&conn);
    for expected in ["schema_version", "customizations", "snapshots", "rollback_records"] {
        assert!(
            tables.contains(&expected.to_string()),
            "Missing table: {}",
            expected
        );
    }
}

#[test]
fn test_migrations_are_idempotent() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();
    apply_migrations(&mut conn).unwrap();

    assert_eq!(
        applied_migrations(&conn).unwrap(),
        vec!["001_initial_schema".to_string(), "002_rollback_records".to_string()]
    );
}

#[test]
fn test_checksums_are_recorded() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let checksums: Vec<String> = conn
        .prepare("SELECT checksum FROM schema_version ORDER BY id")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap();
    assert_eq!(checksums.len(), 2);
    assert!(checksums.iter().all(|c| c.len() == 64));
}

#[test]
fn test_tampered_checksum_is_rejected() {
    // Given: A migrated database whose recorded checksum was altered
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();
    conn.execute(
        "UPDATE schema_version SET checksum = 'bogus' WHERE migration_id = '001_initial_schema'",
        [],
    )
    .unwrap();

    // When: Migrations run again
    let err = apply_migrations(&mut conn).unwrap_err();

    // Then: The runner refuses with an integrity error
    assert_eq!(err.kind(), ExErrorKind::IntegrityMismatch);
}

#[test]
fn test_duplicate_sequence_violates_unique_key() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();
    conn.execute_batch(
        "INSERT INTO customizations (id, scope, baseline_text, current_text, current_hash, status,
            head_sequence, revision, created_at, updated_at)
         VALUES ('c', 's', '', '', 'h', 'active', 0, 0, 't', 't');
         INSERT INTO snapshots (id, customization_id, sequence, kind, forward_patch, inverse_patch,
            before_hash, after_hash, lifecycle, author, summary, created_at, updated_at)
         VALUES ('s1', 'c', 1, 'manual', '[]', '[]', 'h', 'h', 'open', 'u', '', 't', 't');",
    )
    .unwrap();

    let second = conn.execute(
        "INSERT INTO snapshots (id, customization_id, sequence, kind, forward_patch, inverse_patch,
            before_hash, after_hash, lifecycle, author, summary, created_at, updated_at)
         VALUES ('s2', 'c', 1, 'manual', '[]', '[]', 'h', 'h', 'open', 'u', '', 't', 't')",
        [],
    );
    assert!(second.is_err());
}
