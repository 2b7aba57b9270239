//! `LedgerStore` over a single SQLite connection.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use revlex_core::errors::{ExError, ExErrorKind};
use revlex_core::ledger::{LedgerBatch, LedgerStore, StoreResult};
use revlex_core::model::{Customization, RollbackRecord, Snapshot};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::db;
use crate::errors::{from_rusqlite, lock_poisoned, serialization_error, Result};
use crate::ledger::rows::{
    format_time, patch_json, CustomizationRow, RollbackRow, SnapshotRow, CUSTOMIZATION_COLUMNS,
    ROLLBACK_COLUMNS, SNAPSHOT_COLUMNS,
};
use crate::migrations::apply_migrations;

/// SQLite-backed ledger.
///
/// Every `commit` runs in one `BEGIN IMMEDIATE` transaction, so a batch is
/// either fully visible or not at all, and the `(customization_id, sequence)`
/// unique key turns a lost race into `Concurrency`.
pub struct SqliteLedgerStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedgerStore").finish_non_exhaustive()
    }
}

impl SqliteLedgerStore {
    /// Open (or create) a database file and bring its schema up to date
    ///
    /// # Errors
    ///
    /// `Persistence` if the file cannot be opened or a migration fails,
    /// `IntegrityMismatch` if an applied migration was tampered with.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = db::open(path)?;
        Self::from_connection(conn)
    }

    /// Fresh in-memory database with the schema applied
    ///
    /// # Errors
    ///
    /// `Persistence` if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = db::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| lock_poisoned())
    }
}

fn concurrency(customization_id: &str, message: String) -> ExError {
    ExError::new(ExErrorKind::Concurrency)
        .with_op("commit")
        .with_customization_id(customization_id)
        .with_message(message)
}

fn check_guards(tx: &Transaction<'_>, batch: &LedgerBatch) -> Result<()> {
    for guard in &batch.guards {
        let stored: Option<i64> = tx
            .query_row(
                "SELECT revision FROM customizations WHERE id = ?1",
                [&guard.customization_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        if stored != i64::try_from(guard.revision).ok() {
            return Err(concurrency(
                &guard.customization_id,
                format!("expected revision {}, found {:?}", guard.revision, stored),
            ));
        }
    }
    Ok(())
}

fn upsert_customization(tx: &Transaction<'_>, c: &Customization) -> Result<()> {
    // ON CONFLICT keeps the row (and its snapshots); INSERT OR REPLACE would cascade.
    tx.execute(
        "INSERT INTO customizations (id, scope, baseline_text, current_text, current_hash, status,
            open_snapshot_id, head_sequence, origin_customization_id, origin_sequence, revision,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(id) DO UPDATE SET
            scope = excluded.scope,
            baseline_text = excluded.baseline_text,
            current_text = excluded.current_text,
            current_hash = excluded.current_hash,
            status = excluded.status,
            open_snapshot_id = excluded.open_snapshot_id,
            head_sequence = excluded.head_sequence,
            origin_customization_id = excluded.origin_customization_id,
            origin_sequence = excluded.origin_sequence,
            revision = excluded.revision,
            updated_at = excluded.updated_at",
        params![
            c.id,
            c.scope,
            c.baseline_text,
            c.current_text,
            c.current_hash,
            c.status.as_str(),
            c.open_snapshot_id,
            c.head_sequence as i64,
            c.origin.as_ref().map(|o| o.customization_id.as_str()),
            c.origin.as_ref().map(|o| o.sequence as i64),
            c.revision as i64,
            format_time(&c.created_at),
            format_time(&c.updated_at),
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

fn insert_snapshot(tx: &Transaction<'_>, s: &Snapshot) -> Result<()> {
    tx.execute(
        "INSERT INTO snapshots (id, customization_id, sequence, kind, forward_patch, inverse_patch,
            before_hash, after_hash, lifecycle, author, summary, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            s.id,
            s.customization_id,
            s.sequence as i64,
            s.kind.as_str(),
            patch_json("snapshots.forward_patch", &s.forward_patch)?,
            patch_json("snapshots.inverse_patch", &s.inverse_patch)?,
            s.before_hash,
            s.after_hash,
            s.lifecycle.as_str(),
            s.author,
            s.summary,
            format_time(&s.created_at),
            format_time(&s.updated_at),
        ],
    )
    .map_err(|e| {
        let err = from_rusqlite(e);
        if err.kind() == ExErrorKind::Concurrency {
            concurrency(
                &s.customization_id,
                format!("sequence {} already exists", s.sequence),
            )
            .with_sequence(s.sequence)
        } else {
            err
        }
    })?;
    Ok(())
}

fn update_snapshot(tx: &Transaction<'_>, s: &Snapshot) -> Result<()> {
    let changed = tx
        .execute(
            "UPDATE snapshots SET kind = ?2, forward_patch = ?3, inverse_patch = ?4,
                before_hash = ?5, after_hash = ?6, lifecycle = ?7, author = ?8, summary = ?9,
                updated_at = ?10
             WHERE id = ?1",
            params![
                s.id,
                s.kind.as_str(),
                patch_json("snapshots.forward_patch", &s.forward_patch)?,
                patch_json("snapshots.inverse_patch", &s.inverse_patch)?,
                s.before_hash,
                s.after_hash,
                s.lifecycle.as_str(),
                s.author,
                s.summary,
                format_time(&s.updated_at),
            ],
        )
        .map_err(from_rusqlite)?;
    if changed == 0 {
        return Err(ExError::new(ExErrorKind::SnapshotNotFound)
            .with_op("commit")
            .with_snapshot_id(&s.id)
            .with_message("cannot update a missing snapshot"));
    }
    Ok(())
}

fn insert_rollback_record(tx: &Transaction<'_>, r: &RollbackRecord) -> Result<()> {
    let affected = serde_json::to_string(&r.affected_snapshot_ids)
        .map_err(|e| serialization_error("rollback_records.affected_snapshot_ids", e))?;
    tx.execute(
        "INSERT INTO rollback_records (id, customization_id, from_seq, to_seq, kind,
            affected_snapshot_ids, resulting_patch, related_customization_id, reason, actor,
            created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            r.id,
            r.customization_id,
            r.from_seq as i64,
            r.to_seq as i64,
            r.kind.as_str(),
            affected,
            patch_json("rollback_records.resulting_patch", &r.resulting_patch)?,
            r.related_customization_id,
            r.reason,
            r.actor,
            format_time(&r.created_at),
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

fn write_batch(tx: &Transaction<'_>, batch: &LedgerBatch) -> Result<()> {
    check_guards(tx, batch)?;

    for id in &batch.delete_snapshots {
        tx.execute("DELETE FROM snapshots WHERE id = ?1", [id])
            .map_err(from_rusqlite)?;
    }
    for id in &batch.delete_customizations {
        tx.execute("DELETE FROM customizations WHERE id = ?1", [id])
            .map_err(from_rusqlite)?;
    }
    for customization in &batch.put_customizations {
        upsert_customization(tx, customization)?;
    }
    for snapshot in &batch.insert_snapshots {
        insert_snapshot(tx, snapshot)?;
    }
    for snapshot in &batch.update_snapshots {
        update_snapshot(tx, snapshot)?;
    }
    for record in &batch.rollback_records {
        insert_rollback_record(tx, record)?;
    }
    Ok(())
}

impl LedgerStore for SqliteLedgerStore {
    fn get_customization(&self, id: &str) -> StoreResult<Option<Customization>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM customizations WHERE id = ?1",
            CUSTOMIZATION_COLUMNS
        );
        let row = conn
            .query_row(&sql, [id], CustomizationRow::read)
            .optional()
            .map_err(from_rusqlite)?;
        row.map(CustomizationRow::into_model).transpose()
    }

    fn get_snapshot(&self, id: &str) -> StoreResult<Option<Snapshot>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM snapshots WHERE id = ?1", SNAPSHOT_COLUMNS);
        let row = conn
            .query_row(&sql, [id], SnapshotRow::read)
            .optional()
            .map_err(from_rusqlite)?;
        row.map(SnapshotRow::into_model).transpose()
    }

    fn list_by_seq(&self, customization_id: &str) -> StoreResult<Vec<Snapshot>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM snapshots WHERE customization_id = ?1 ORDER BY sequence",
            SNAPSHOT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([customization_id], SnapshotRow::read)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(SnapshotRow::into_model).collect()
    }

    fn list_rollback_records(&self, customization_id: &str) -> StoreResult<Vec<RollbackRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM rollback_records WHERE customization_id = ?1
             ORDER BY created_at, rowid",
            ROLLBACK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([customization_id], RollbackRow::read)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(RollbackRow::into_model).collect()
    }

    fn list_customizations(&self) -> StoreResult<Vec<Customization>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM customizations ORDER BY created_at, id",
            CUSTOMIZATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], CustomizationRow::read)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(CustomizationRow::into_model).collect()
    }

    fn commit(&self, batch: LedgerBatch) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;

        // Dropping `tx` on error rolls back.
        write_batch(&tx, &batch)?;
        tx.commit().map_err(from_rusqlite)?;

        tracing::debug!(
            component = "sqlite_ledger",
            customizations = batch.put_customizations.len(),
            snapshots = batch.insert_snapshots.len() + batch.update_snapshots.len(),
            rollback_records = batch.rollback_records.len(),
            "batch committed"
        );
        Ok(())
    }
}
