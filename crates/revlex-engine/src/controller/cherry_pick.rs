//! Cherry-pick: replay chosen snapshots of one customization onto another.

use chrono::Utc;
use revlex_core::errors::{ExError, ExErrorKind, RevlexError};
use revlex_core::ledger::{stage_append, stage_customization, LedgerBatch, LedgerStore, SnapshotDraft};
use revlex_core::model::{
    ChangeKind, ChangeMeta, Customization, Lifecycle, RollbackKind, RollbackRecord, Snapshot,
};
use revlex_core::patch::apply;
use revlex_core_types::IdKind;
use serde::Serialize;

use super::{verify_hash, VersionController};
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct CherryPickResult {
    pub target: Customization,
    /// The single `cherry_pick` snapshot holding every picked change
    pub snapshot: Snapshot,
    pub record: RollbackRecord,
    /// Source sequences in the order they were applied
    pub applied_sequences: Vec<u64>,
}

impl<S: LedgerStore> VersionController<S> {
    /// Apply the forward patches of `sequences` from `source_id`, ascending,
    /// to the current text of `target_id`.
    ///
    /// Before each step the target text must hash to that snapshot's `before`
    /// hash, and after it to its `after` hash. The first failure aborts the
    /// whole pick and nothing is written; on success the target gets one
    /// finalized `cherry_pick` snapshot (after finalizing any open snapshot
    /// in the same commit) and a `cherry_pick` rollback record.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty sequence list
    /// - `SnapshotNotFound` / `IllegalState` for a missing or still open source snapshot
    /// - `IntegrityMismatch` / `PatchApplication` naming the failing sequence
    pub fn cherry_pick(
        &self,
        source_id: &str,
        sequences: &[u64],
        target_id: &str,
        actor: &str,
    ) -> Result<CherryPickResult> {
        self.observed("cherry_pick", target_id, || {
            if sequences.is_empty() {
                return Err(ExError::new(ExErrorKind::InvalidInput)
                    .with_op("cherry_pick")
                    .with_message("no sequences to cherry-pick"));
            }
            let mut picked = sequences.to_vec();
            picked.sort_unstable();
            picked.dedup();

            let source = self.ledger.list(source_id)?;
            let picks = picked
                .iter()
                .map(|&seq| {
                    let snapshot = source.iter().find(|s| s.sequence == seq).ok_or_else(|| {
                        ExError::new(ExErrorKind::SnapshotNotFound)
                            .with_op("cherry_pick")
                            .with_customization_id(source_id)
                            .with_sequence(seq)
                            .with_message("no snapshot at this sequence")
                    })?;
                    if !snapshot.is_finalized() {
                        return Err(ExError::from(RevlexError::SnapshotNotFinalized {
                            snapshot_id: snapshot.id.clone(),
                        })
                        .with_op("cherry_pick")
                        .with_sequence(seq));
                    }
                    Ok(snapshot)
                })
                .collect::<Result<Vec<&Snapshot>>>()?;

            self.serialized("cherry_pick", target_id, || {
                self.cherry_pick_attempt(source_id, &picks, target_id, actor)
            })
        })
    }

    fn cherry_pick_attempt(
        &self,
        source_id: &str,
        picks: &[&Snapshot],
        target_id: &str,
        actor: &str,
    ) -> Result<CherryPickResult> {
        let mut target = self.load_active("cherry_pick", target_id)?;

        let mut text = target.current_text.clone();
        for snapshot in picks {
            let tag = |e: ExError| {
                e.with_op("cherry_pick")
                    .with_customization_id(target_id)
                    .with_snapshot_id(&snapshot.id)
                    .with_sequence(snapshot.sequence)
            };
            verify_hash("cherry_pick", &snapshot.before_hash, &text).map_err(tag)?;
            text = apply(&snapshot.forward_patch, &text).map_err(|e| tag(e.into()))?;
            verify_hash("cherry_pick", &snapshot.after_hash, &text).map_err(tag)?;
        }

        let applied_sequences: Vec<u64> = picks.iter().map(|s| s.sequence).collect();
        let revision = target.revision;
        let now = Utc::now();
        let mut batch = LedgerBatch::new();
        self.seal_open(&mut batch, &mut target, now)?;

        let summary = format!(
            "cherry-pick sequences {} from {}",
            applied_sequences
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            source_id
        );
        let draft = SnapshotDraft::from_texts(
            &target.current_text,
            &text,
            ChangeMeta {
                kind: ChangeKind::CherryPick,
                author: actor.to_string(),
                summary: Some(summary),
            },
        );
        let snapshot = stage_append(&mut batch, &mut target, draft, Lifecycle::Finalized, now)?;
        let record = RollbackRecord {
            id: IdKind::RollbackRecord.generate(),
            customization_id: target.id.clone(),
            from_seq: applied_sequences.first().copied().unwrap_or_default(),
            to_seq: applied_sequences.last().copied().unwrap_or_default(),
            kind: RollbackKind::CherryPick,
            affected_snapshot_ids: picks.iter().map(|s| s.id.clone()).collect(),
            resulting_patch: snapshot.forward_patch.clone(),
            related_customization_id: Some(source_id.to_string()),
            reason: None,
            actor: actor.to_string(),
            created_at: now,
        };
        batch.record_rollback(record.clone());
        stage_customization(&mut batch, revision, &mut target);
        self.store().commit(batch)?;

        Ok(CherryPickResult {
            target,
            snapshot,
            record,
            applied_sequences,
        })
    }
}
