//! In-memory ledger store.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{ExError, ExErrorKind};
use crate::ledger::store::{LedgerBatch, LedgerStore, StoreResult};
use crate::model::{Customization, RollbackRecord, Snapshot};

#[derive(Debug, Default)]
struct MemoryState {
    customizations: HashMap<String, Customization>,
    snapshots: HashMap<String, Snapshot>,
    rollback_records: Vec<RollbackRecord>,
}

/// HashMap-backed store guarded by one `RwLock`.
///
/// `commit` validates the whole batch under the write lock before touching
/// any map, so a rejected batch leaves no trace.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: RwLock<MemoryState>,
}

fn poisoned() -> ExError {
    ExError::new(ExErrorKind::Internal).with_message("ledger store lock poisoned")
}

fn concurrency(customization_id: &str, message: String) -> ExError {
    ExError::new(ExErrorKind::Concurrency)
        .with_op("commit")
        .with_customization_id(customization_id)
        .with_message(message)
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    fn validate(&self, batch: &LedgerBatch) -> StoreResult<()> {
        for guard in &batch.guards {
            let stored = self
                .customizations
                .get(&guard.customization_id)
                .map(|c| c.revision);
            if stored != Some(guard.revision) {
                return Err(concurrency(
                    &guard.customization_id,
                    format!(
                        "expected revision {}, found {:?}",
                        guard.revision, stored
                    ),
                ));
            }
        }

        let mut pending: Vec<(&str, u64)> = Vec::new();
        for snapshot in &batch.insert_snapshots {
            let key = (snapshot.customization_id.as_str(), snapshot.sequence);
            let taken = pending.contains(&key)
                || self.snapshots.values().any(|s| {
                    s.customization_id == snapshot.customization_id
                        && s.sequence == snapshot.sequence
                        && !batch.delete_snapshots.contains(&s.id)
                });
            if taken {
                return Err(concurrency(
                    &snapshot.customization_id,
                    format!("sequence {} already exists", snapshot.sequence),
                )
                .with_sequence(snapshot.sequence));
            }
            pending.push(key);
        }

        for snapshot in &batch.update_snapshots {
            if !self.snapshots.contains_key(&snapshot.id) {
                return Err(ExError::new(ExErrorKind::SnapshotNotFound)
                    .with_op("commit")
                    .with_snapshot_id(&snapshot.id)
                    .with_message("cannot update a missing snapshot"));
            }
        }
        Ok(())
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn get_customization(&self, id: &str) -> StoreResult<Option<Customization>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.customizations.get(id).cloned())
    }

    fn get_snapshot(&self, id: &str) -> StoreResult<Option<Snapshot>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.snapshots.get(id).cloned())
    }

    fn list_by_seq(&self, customization_id: &str) -> StoreResult<Vec<Snapshot>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let mut snapshots: Vec<Snapshot> = state
            .snapshots
            .values()
            .filter(|s| s.customization_id == customization_id)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.sequence);
        Ok(snapshots)
    }

    fn list_rollback_records(&self, customization_id: &str) -> StoreResult<Vec<RollbackRecord>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .rollback_records
            .iter()
            .filter(|r| r.customization_id == customization_id)
            .cloned()
            .collect())
    }

    fn list_customizations(&self) -> StoreResult<Vec<Customization>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        let mut all: Vec<Customization> = state.customizations.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    fn commit(&self, batch: LedgerBatch) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.validate(&batch)?;

        for id in &batch.delete_snapshots {
            state.snapshots.remove(id);
        }
        for id in &batch.delete_customizations {
            state.customizations.remove(id);
            state.snapshots.retain(|_, s| &s.customization_id != id);
            state.rollback_records.retain(|r| &r.customization_id != id);
        }
        for customization in batch.put_customizations {
            state
                .customizations
                .insert(customization.id.clone(), customization);
        }
        for snapshot in batch.insert_snapshots.into_iter().chain(batch.update_snapshots) {
            state.snapshots.insert(snapshot.id.clone(), snapshot);
        }
        state.rollback_records.extend(batch.rollback_records);
        Ok(())
    }
}
