//! Storage boundary for the snapshot ledger.
//!
//! The ledger's storage is the only shared mutable resource in the engine.
//! Reads are plain lookups; every write goes through [`LedgerStore::commit`]
//! as one [`LedgerBatch`] that lands completely or not at all.

use crate::errors::ExError;
use crate::model::{Customization, RollbackRecord, Snapshot};

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, ExError>;

/// Expected revision of a customization at commit time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionGuard {
    pub customization_id: String,
    pub revision: u64,
}

/// A set of writes committed atomically.
///
/// Commit fails with `ExErrorKind::Concurrency` and applies nothing when
/// any guard's revision differs from the stored one, or when an inserted
/// snapshot's `(customization_id, sequence)` already exists.
#[derive(Debug, Clone, Default)]
pub struct LedgerBatch {
    pub guards: Vec<RevisionGuard>,
    /// Inserted or replaced whole
    pub put_customizations: Vec<Customization>,
    pub insert_snapshots: Vec<Snapshot>,
    pub update_snapshots: Vec<Snapshot>,
    pub rollback_records: Vec<RollbackRecord>,
    pub delete_snapshots: Vec<String>,
    /// Also removes the customization's snapshots and rollback records
    pub delete_customizations: Vec<String>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `customization_id` to still be at `revision`
    pub fn guard(&mut self, customization_id: impl Into<String>, revision: u64) -> &mut Self {
        self.guards.push(RevisionGuard {
            customization_id: customization_id.into(),
            revision,
        });
        self
    }

    pub fn put_customization(&mut self, customization: Customization) -> &mut Self {
        self.put_customizations.retain(|c| c.id != customization.id);
        self.put_customizations.push(customization);
        self
    }

    pub fn insert_snapshot(&mut self, snapshot: Snapshot) -> &mut Self {
        self.insert_snapshots.push(snapshot);
        self
    }

    /// Update a snapshot; an update to a snapshot inserted in the same batch
    /// replaces the pending insert.
    pub fn update_snapshot(&mut self, snapshot: Snapshot) -> &mut Self {
        if let Some(pending) = self.insert_snapshots.iter_mut().find(|s| s.id == snapshot.id) {
            *pending = snapshot;
            return self;
        }
        self.update_snapshots.retain(|s| s.id != snapshot.id);
        self.update_snapshots.push(snapshot);
        self
    }

    pub fn record_rollback(&mut self, record: RollbackRecord) -> &mut Self {
        self.rollback_records.push(record);
        self
    }

    pub fn delete_snapshot(&mut self, snapshot_id: impl Into<String>) -> &mut Self {
        self.delete_snapshots.push(snapshot_id.into());
        self
    }

    pub fn delete_customization(&mut self, customization_id: impl Into<String>) -> &mut Self {
        self.delete_customizations.push(customization_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.put_customizations.is_empty()
            && self.insert_snapshots.is_empty()
            && self.update_snapshots.is_empty()
            && self.rollback_records.is_empty()
            && self.delete_snapshots.is_empty()
            && self.delete_customizations.is_empty()
    }
}

/// Injected persistence for customizations, snapshots and rollback records.
///
/// Implementations must be safe to share across threads.
pub trait LedgerStore: Send + Sync {
    fn get_customization(&self, id: &str) -> StoreResult<Option<Customization>>;

    fn get_snapshot(&self, id: &str) -> StoreResult<Option<Snapshot>>;

    /// All snapshots of a customization ordered by sequence
    fn list_by_seq(&self, customization_id: &str) -> StoreResult<Vec<Snapshot>>;

    /// Rollback records attached to a customization, oldest first
    fn list_rollback_records(&self, customization_id: &str) -> StoreResult<Vec<RollbackRecord>>;

    /// All customizations ordered by creation time
    fn list_customizations(&self) -> StoreResult<Vec<Customization>>;

    /// Apply a batch atomically
    ///
    /// # Errors
    ///
    /// `Concurrency` on a guard or sequence conflict, `Persistence` on storage failure.
    fn commit(&self, batch: LedgerBatch) -> StoreResult<()>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<S> {
    fn get_customization(&self, id: &str) -> StoreResult<Option<Customization>> {
        (**self).get_customization(id)
    }

    fn get_snapshot(&self, id: &str) -> StoreResult<Option<Snapshot>> {
        (**self).get_snapshot(id)
    }

    fn list_by_seq(&self, customization_id: &str) -> StoreResult<Vec<Snapshot>> {
        (**self).list_by_seq(customization_id)
    }

    fn list_rollback_records(&self, customization_id: &str) -> StoreResult<Vec<RollbackRecord>> {
        (**self).list_rollback_records(customization_id)
    }

    fn list_customizations(&self) -> StoreResult<Vec<Customization>> {
        (**self).list_customizations()
    }

    fn commit(&self, batch: LedgerBatch) -> StoreResult<()> {
        (**self).commit(batch)
    }
}
