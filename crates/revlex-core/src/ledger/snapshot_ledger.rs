//! Snapshot ledger operations.
//!
//! The ledger owns sequence assignment and the open-snapshot rule:
//!
//! - sequence of a new snapshot = head sequence + 1, committed under a
//!   revision guard so concurrent writers cannot both claim it
//! - a customization has at most one open snapshot, referenced by
//!   `Customization::open_snapshot_id`
//! - amending the open snapshot rewrites its patches and `after` hash in
//!   place, keeping its sequence
//! - finalizing freezes the snapshot; finalizing twice is a no-op
//!
//! The `stage_*` functions only describe writes in a [`LedgerBatch`] so the
//! version controller can combine several of them into one atomic commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use revlex_core_types::IdKind;

use crate::diff::engine::diff_lines;
use crate::diff::human_summary::render_human_summary;
use crate::document::content_hash;
use crate::errors::{ExError, ExErrorKind, RevlexError};
use crate::ledger::store::{LedgerBatch, LedgerStore, StoreResult};
use crate::model::{ChangeMeta, Customization, Lifecycle, Snapshot};
use crate::patch::{apply, diff_patch, invert, Patch};

/// Everything needed to write one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDraft {
    pub meta: ChangeMeta,
    pub forward_patch: Patch,
    pub inverse_patch: Patch,
    pub before_hash: String,
    pub after_hash: String,
    pub after_text: String,
    /// Resolved summary (caller's or generated)
    pub summary: String,
}

impl SnapshotDraft {
    /// Diff `before` against `after`; both patches are re-diffed
    pub fn from_texts(before: &str, after: &str, meta: ChangeMeta) -> Self {
        let summary = meta
            .summary
            .clone()
            .unwrap_or_else(|| render_human_summary(&diff_lines(before, after)));
        Self {
            forward_patch: diff_patch(before, after),
            inverse_patch: invert(before, after),
            before_hash: content_hash(before),
            after_hash: content_hash(after),
            after_text: after.to_string(),
            summary,
            meta,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.before_hash == self.after_hash
    }
}

fn illegal_state(op: &str, customization_id: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::IllegalState)
        .with_op(op)
        .with_customization_id(customization_id)
        .with_message(message)
}

/// Stage a new snapshot at `head_sequence + 1` and move the customization's
/// current text to the draft's `after` text.
///
/// # Errors
///
/// - `IllegalState` if the customization is archived or already has an open snapshot
/// - `IntegrityMismatch` if the draft was not computed from the current text
pub fn stage_append(
    batch: &mut LedgerBatch,
    customization: &mut Customization,
    draft: SnapshotDraft,
    lifecycle: Lifecycle,
    now: DateTime<Utc>,
) -> StoreResult<Snapshot> {
    if customization.is_archived() {
        return Err(RevlexError::CustomizationArchived {
            customization_id: customization.id.clone(),
        }
        .into());
    }
    if let Some(open) = &customization.open_snapshot_id {
        return Err(illegal_state(
            "append",
            &customization.id,
            format!("snapshot {} is still open", open),
        ));
    }
    if draft.before_hash != customization.current_hash {
        return Err(ExError::from(RevlexError::IntegrityMismatch {
            context: "append".to_string(),
            expected: customization.current_hash.clone(),
            actual: draft.before_hash,
        })
        .with_customization_id(&customization.id));
    }

    let snapshot = Snapshot {
        id: IdKind::Snapshot.generate(),
        customization_id: customization.id.clone(),
        sequence: customization.next_sequence(),
        kind: draft.meta.kind,
        forward_patch: draft.forward_patch,
        inverse_patch: draft.inverse_patch,
        before_hash: draft.before_hash,
        after_hash: draft.after_hash,
        lifecycle,
        author: draft.meta.author,
        summary: draft.summary,
        created_at: now,
        updated_at: now,
    };

    customization.head_sequence = snapshot.sequence;
    if lifecycle == Lifecycle::Open {
        customization.open_snapshot_id = Some(snapshot.id.clone());
    }
    customization.set_current_text(draft.after_text, now);

    batch.insert_snapshot(snapshot.clone());
    Ok(snapshot)
}

/// Rewrite the open snapshot so it goes from its original `before` text to
/// `new_text`, keeping id and sequence.
///
/// # Errors
///
/// - `IllegalState` if `open` is finalized or is not the customization's open snapshot
/// - `IntegrityMismatch` if the open snapshot's inverse does not lead back to its `before` hash
pub fn stage_amend(
    batch: &mut LedgerBatch,
    customization: &mut Customization,
    open: &Snapshot,
    new_text: &str,
    meta: ChangeMeta,
    now: DateTime<Utc>,
) -> StoreResult<Snapshot> {
    if open.is_finalized() {
        return Err(RevlexError::SnapshotFinalized {
            snapshot_id: open.id.clone(),
        }
        .into());
    }
    if customization.open_snapshot_id.as_deref() != Some(open.id.as_str()) {
        return Err(illegal_state(
            "amend_open",
            &customization.id,
            format!("snapshot {} is not the open snapshot", open.id),
        ));
    }

    let before = apply(&open.inverse_patch, &customization.current_text)
        .map_err(|e| ExError::from(e).with_op("amend_open").with_snapshot_id(&open.id))?;
    let before_hash = content_hash(&before);
    if before_hash != open.before_hash {
        return Err(ExError::from(RevlexError::IntegrityMismatch {
            context: "amend_open".to_string(),
            expected: open.before_hash.clone(),
            actual: before_hash,
        })
        .with_snapshot_id(&open.id));
    }

    let draft = SnapshotDraft::from_texts(&before, new_text, meta);
    let amended = Snapshot {
        kind: draft.meta.kind,
        forward_patch: draft.forward_patch,
        inverse_patch: draft.inverse_patch,
        after_hash: draft.after_hash,
        author: draft.meta.author,
        summary: draft.summary,
        updated_at: now,
        ..open.clone()
    };
    customization.set_current_text(draft.after_text, now);

    batch.update_snapshot(amended.clone());
    Ok(amended)
}

/// Stage finalization of `snapshot`. Returns `None` if it already is.
pub fn stage_finalize(
    batch: &mut LedgerBatch,
    customization: &mut Customization,
    snapshot: &Snapshot,
    now: DateTime<Utc>,
) -> Option<Snapshot> {
    if snapshot.is_finalized() {
        return None;
    }
    let finalized = Snapshot {
        lifecycle: Lifecycle::Finalized,
        updated_at: now,
        ..snapshot.clone()
    };
    if customization.open_snapshot_id.as_deref() == Some(snapshot.id.as_str()) {
        customization.open_snapshot_id = None;
        customization.updated_at = now;
    }
    batch.update_snapshot(finalized.clone());
    Some(finalized)
}

/// Add the revision guard and the updated customization to `batch`
pub fn stage_customization(batch: &mut LedgerBatch, loaded_revision: u64, customization: &mut Customization) {
    batch.guard(customization.id.clone(), loaded_revision);
    customization.revision = loaded_revision + 1;
    batch.put_customization(customization.clone());
}

/// Snapshot ledger over an injected store
#[derive(Debug)]
pub struct SnapshotLedger<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> Clone for SnapshotLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> SnapshotLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load a customization
    ///
    /// # Errors
    ///
    /// `NotFound` if it does not exist.
    pub fn customization(&self, customization_id: &str) -> StoreResult<Customization> {
        self.store
            .get_customization(customization_id)?
            .ok_or_else(|| {
                RevlexError::CustomizationNotFound {
                    customization_id: customization_id.to_string(),
                }
                .into()
            })
    }

    /// Load a snapshot by id
    ///
    /// # Errors
    ///
    /// `SnapshotNotFound` if it does not exist.
    pub fn snapshot(&self, snapshot_id: &str) -> StoreResult<Snapshot> {
        self.store.get_snapshot(snapshot_id)?.ok_or_else(|| {
            RevlexError::SnapshotNotFound {
                snapshot_id: snapshot_id.to_string(),
            }
            .into()
        })
    }

    /// Snapshots of a customization ordered by sequence
    pub fn list(&self, customization_id: &str) -> StoreResult<Vec<Snapshot>> {
        self.customization(customization_id)?;
        self.store.list_by_seq(customization_id)
    }

    pub fn by_sequence(&self, customization_id: &str, sequence: u64) -> StoreResult<Option<Snapshot>> {
        Ok(self
            .store
            .list_by_seq(customization_id)?
            .into_iter()
            .find(|s| s.sequence == sequence))
    }

    /// The open snapshot, found through `Customization::open_snapshot_id`
    pub fn get_open(&self, customization_id: &str) -> StoreResult<Option<Snapshot>> {
        let customization = self.customization(customization_id)?;
        match customization.open_snapshot_id {
            Some(id) => self.snapshot(&id).map(Some),
            None => Ok(None),
        }
    }

    /// Append a snapshot and commit
    ///
    /// # Errors
    ///
    /// See [`stage_append`]; `Concurrency` if another writer committed first.
    pub fn append(&self, customization_id: &str, draft: SnapshotDraft, lifecycle: Lifecycle) -> StoreResult<Snapshot> {
        let mut customization = self.customization(customization_id)?;
        let revision = customization.revision;
        let mut batch = LedgerBatch::new();
        let snapshot = stage_append(&mut batch, &mut customization, draft, lifecycle, Utc::now())?;
        stage_customization(&mut batch, revision, &mut customization);
        self.store.commit(batch)?;
        tracing::debug!(
            component = "ledger",
            customization_id = %customization_id,
            sequence = snapshot.sequence,
            "snapshot appended"
        );
        Ok(snapshot)
    }

    /// Amend the open snapshot to end at `new_text` and commit
    ///
    /// # Errors
    ///
    /// `IllegalState` if there is no open snapshot; see [`stage_amend`].
    pub fn amend_open(&self, customization_id: &str, new_text: &str, meta: ChangeMeta) -> StoreResult<Snapshot> {
        let mut customization = self.customization(customization_id)?;
        let open_id = customization
            .open_snapshot_id
            .clone()
            .ok_or_else(|| illegal_state("amend_open", customization_id, "no open snapshot"))?;
        let open = self.snapshot(&open_id)?;
        let revision = customization.revision;
        let mut batch = LedgerBatch::new();
        let amended = stage_amend(&mut batch, &mut customization, &open, new_text, meta, Utc::now())?;
        stage_customization(&mut batch, revision, &mut customization);
        self.store.commit(batch)?;
        Ok(amended)
    }

    /// Finalize a snapshot. Finalizing an already finalized snapshot returns
    /// it unchanged without writing.
    ///
    /// # Errors
    ///
    /// `SnapshotNotFound` if it does not exist.
    pub fn finalize(&self, snapshot_id: &str) -> StoreResult<Snapshot> {
        let snapshot = self.snapshot(snapshot_id)?;
        if snapshot.is_finalized() {
            return Ok(snapshot);
        }
        let mut customization = self.customization(&snapshot.customization_id)?;
        let revision = customization.revision;
        let mut batch = LedgerBatch::new();
        let finalized = stage_finalize(&mut batch, &mut customization, &snapshot, Utc::now())
            .unwrap_or_else(|| snapshot.clone());
        stage_customization(&mut batch, revision, &mut customization);
        self.store.commit(batch)?;
        Ok(finalized)
    }
}
