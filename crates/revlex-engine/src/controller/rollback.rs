//! Rollback: full (in-place or branch) and selective.
//!
//! A full rollback to sequence `k` composes the inverse patches of every
//! snapshot after `k`, newest first, applies the composite to the current
//! text and insists that the result hashes to snapshot `k`'s `after` hash.
//! Inverse composition drifts if any patch was recorded against the wrong
//! base, so a mismatch aborts the call before anything is written.

use chrono::Utc;
use revlex_core::errors::{ExError, ExErrorKind, RevlexError};
use revlex_core::ledger::{stage_append, stage_customization, LedgerBatch, LedgerStore, SnapshotDraft};
use revlex_core::model::{
    BranchOrigin, ChangeKind, ChangeMeta, Customization, Lifecycle, RollbackKind, RollbackRecord,
    Snapshot,
};
use revlex_core::patch::{anchor, apply, compose, diff_patch, Patch};
use revlex_core_types::IdKind;
use serde::{Deserialize, Serialize};

use super::{verify_hash, VersionController};
use crate::Result;

/// Where the rolled-back content lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackMode {
    /// Append a `rollback` snapshot to the live customization
    InPlace,
    /// Seed a new customization with the target content; the original keeps
    /// its history untouched
    Branch,
}

/// Who asked for a rollback, and why
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackRequest {
    pub actor: String,
    pub reason: Option<String>,
}

impl RollbackRequest {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RollbackResult {
    pub mode: RollbackMode,
    /// Customization now holding the restored content (the new branch in
    /// branch mode)
    pub customization: Customization,
    /// `rollback` snapshot (in-place) or the branch's initial snapshot
    pub snapshot: Option<Snapshot>,
    pub record: Option<RollbackRecord>,
}

impl RollbackResult {
    /// True when the target already was the head and nothing was written
    pub fn is_noop(&self) -> bool {
        self.record.is_none()
    }
}

fn target_not_found(customization_id: &str, sequence: u64) -> ExError {
    ExError::from(RevlexError::RollbackTargetNotFound {
        customization_id: customization_id.to_string(),
        sequence,
    })
    .with_op("rollback")
}

fn meta(actor: &str, summary: String) -> ChangeMeta {
    ChangeMeta {
        kind: ChangeKind::Rollback,
        author: actor.to_string(),
        summary: Some(summary),
    }
}

fn join_sequences(sequences: &[u64]) -> String {
    sequences
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl<S: LedgerStore> VersionController<S> {
    /// Restore the content of finalized snapshot `target_seq`.
    ///
    /// In-place mode finalizes any open snapshot in the same commit, then
    /// appends a finalized `rollback` snapshot and a `full` rollback record.
    /// Targeting the current head writes nothing. Branch mode creates a new
    /// customization seeded with the target content and records the
    /// rollback against the original.
    ///
    /// # Errors
    ///
    /// - `RollbackTargetNotFound` if `target_seq` is not a finalized snapshot
    /// - `IntegrityMismatch` if the composed inverses do not reproduce the target
    pub fn rollback(
        &self,
        customization_id: &str,
        target_seq: u64,
        mode: RollbackMode,
        request: RollbackRequest,
    ) -> Result<RollbackResult> {
        self.observed("rollback", customization_id, || {
            self.serialized("rollback", customization_id, || {
                self.rollback_attempt(customization_id, target_seq, mode, &request)
            })
        })
    }

    fn rollback_attempt(
        &self,
        customization_id: &str,
        target_seq: u64,
        mode: RollbackMode,
        request: &RollbackRequest,
    ) -> Result<RollbackResult> {
        let mut customization = match mode {
            RollbackMode::InPlace => self.load_active("rollback", customization_id)?,
            RollbackMode::Branch => self.ledger.customization(customization_id)?,
        };
        let snapshots = self.ledger.list(customization_id)?;
        let target = snapshots
            .iter()
            .find(|s| s.sequence == target_seq && s.is_finalized())
            .ok_or_else(|| target_not_found(customization_id, target_seq))?;

        if mode == RollbackMode::InPlace && target_seq == customization.head_sequence {
            return Ok(RollbackResult {
                mode,
                customization,
                snapshot: None,
                record: None,
            });
        }

        let mut later: Vec<&Snapshot> = snapshots.iter().filter(|s| s.sequence > target_seq).collect();
        later.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        let inverses: Vec<Patch> = later.iter().map(|s| s.inverse_patch.clone()).collect();
        let composite = compose(&inverses);

        let target_text = apply(&composite, &customization.current_text)
            .map_err(|e| ExError::from(e).with_op("rollback").with_sequence(target_seq))?;
        verify_hash("rollback", &target.after_hash, &target_text).map_err(|e| {
            e.with_customization_id(customization_id)
                .with_sequence(target_seq)
        })?;

        let affected: Vec<String> = later.iter().rev().map(|s| s.id.clone()).collect();
        let revision = customization.revision;
        let now = Utc::now();
        let mut batch = LedgerBatch::new();

        match mode {
            RollbackMode::InPlace => {
                self.seal_open(&mut batch, &mut customization, now)?;
                let from_seq = customization.head_sequence;
                let draft = SnapshotDraft::from_texts(
                    &customization.current_text,
                    &target_text,
                    meta(&request.actor, format!("rollback to sequence {}", target_seq)),
                );
                let snapshot =
                    stage_append(&mut batch, &mut customization, draft, Lifecycle::Finalized, now)?;
                let record = RollbackRecord {
                    id: IdKind::RollbackRecord.generate(),
                    customization_id: customization.id.clone(),
                    from_seq,
                    to_seq: target_seq,
                    kind: RollbackKind::Full,
                    affected_snapshot_ids: affected,
                    resulting_patch: snapshot.forward_patch.clone(),
                    related_customization_id: None,
                    reason: request.reason.clone(),
                    actor: request.actor.clone(),
                    created_at: now,
                };
                batch.record_rollback(record.clone());
                stage_customization(&mut batch, revision, &mut customization);
                self.store().commit(batch)?;
                tracing::debug!(
                    component = "rollback",
                    customization_id,
                    from_seq,
                    to_seq = target_seq,
                    "in-place rollback committed"
                );
                Ok(RollbackResult {
                    mode,
                    customization,
                    snapshot: Some(snapshot),
                    record: Some(record),
                })
            }
            RollbackMode::Branch => {
                let origin = BranchOrigin {
                    customization_id: customization.id.clone(),
                    sequence: target_seq,
                };
                let (branch, initial) = self.stage_new_customization(
                    &mut batch,
                    &target_text,
                    &customization.scope,
                    Some(origin),
                    ChangeMeta {
                        kind: ChangeKind::Initial,
                        author: request.actor.clone(),
                        summary: Some(format!(
                            "branched from {} at sequence {}",
                            customization.id, target_seq
                        )),
                    },
                )?;
                let record = RollbackRecord {
                    id: IdKind::RollbackRecord.generate(),
                    customization_id: customization.id.clone(),
                    from_seq: customization.head_sequence,
                    to_seq: target_seq,
                    kind: RollbackKind::Full,
                    affected_snapshot_ids: affected,
                    resulting_patch: diff_patch(&customization.current_text, &target_text),
                    related_customization_id: Some(branch.id.clone()),
                    reason: request.reason.clone(),
                    actor: request.actor.clone(),
                    created_at: now,
                };
                batch.record_rollback(record.clone());
                // The target text was derived from this revision of the original.
                batch.guard(customization.id.clone(), revision);
                self.store().commit(batch)?;
                Ok(RollbackResult {
                    mode,
                    customization: branch,
                    snapshot: Some(initial),
                    record: Some(record),
                })
            }
        }
    }

    /// Undo specific snapshots while keeping everything else.
    ///
    /// History is replayed from the baseline skipping `sequences`. Every
    /// kept patch must find the lines it touched exactly as they were when it
    /// was recorded; a later edit that depended on a reverted one is a
    /// conflict, and the call aborts with no writes. Success appends one
    /// finalized `rollback` snapshot and a `selective` rollback record.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty sequence list
    /// - `RollbackTargetNotFound` for an unknown sequence
    /// - `ConflictBlocked` if a kept patch no longer lines up
    /// - `IntegrityMismatch` if the recorded history does not replay
    pub fn revert_snapshots(
        &self,
        customization_id: &str,
        sequences: &[u64],
        request: RollbackRequest,
    ) -> Result<RollbackResult> {
        self.observed("revert_snapshots", customization_id, || {
            if sequences.is_empty() {
                return Err(ExError::new(ExErrorKind::InvalidInput)
                    .with_op("revert_snapshots")
                    .with_message("no sequences to revert"));
            }
            let mut skipped = sequences.to_vec();
            skipped.sort_unstable();
            skipped.dedup();
            self.serialized("revert_snapshots", customization_id, || {
                self.revert_attempt(customization_id, &skipped, &request)
            })
        })
    }

    fn revert_attempt(
        &self,
        customization_id: &str,
        skipped: &[u64],
        request: &RollbackRequest,
    ) -> Result<RollbackResult> {
        let mut customization = self.load_active("revert_snapshots", customization_id)?;
        let snapshots = self.ledger.list(customization_id)?;
        for &seq in skipped {
            if !snapshots.iter().any(|s| s.sequence == seq) {
                return Err(target_not_found(customization_id, seq).with_op("revert_snapshots"));
            }
        }

        // `recorded` follows the real history; `text` skips the reverted
        // snapshots. Each kept patch is pinned to the lines it saw when it
        // was recorded, so a shifted base fails instead of editing the
        // wrong line.
        let mut recorded = customization.baseline_text.clone();
        let mut text = customization.baseline_text.clone();
        for snapshot in &snapshots {
            let at_seq = |e: ExError| {
                e.with_op("revert_snapshots")
                    .with_customization_id(customization_id)
                    .with_sequence(snapshot.sequence)
            };
            verify_hash("revert_snapshots", &snapshot.before_hash, &recorded).map_err(at_seq)?;
            if !skipped.contains(&snapshot.sequence) {
                let pinned =
                    anchor(&snapshot.forward_patch, &recorded).map_err(|e| at_seq(e.into()))?;
                text = apply(&pinned, &text).map_err(|e| {
                    at_seq(
                        ExError::new(ExErrorKind::ConflictBlocked)
                            .with_message(format!(
                                "sequence {} no longer lines up after reverting {}",
                                snapshot.sequence,
                                join_sequences(skipped)
                            ))
                            .with_source(e.into()),
                    )
                })?;
            }
            recorded = apply(&snapshot.forward_patch, &recorded).map_err(|e| at_seq(e.into()))?;
        }

        let affected: Vec<String> = snapshots
            .iter()
            .filter(|s| skipped.contains(&s.sequence))
            .map(|s| s.id.clone())
            .collect();
        let revision = customization.revision;
        let now = Utc::now();
        let mut batch = LedgerBatch::new();
        self.seal_open(&mut batch, &mut customization, now)?;
        let from_seq = customization.head_sequence;

        let draft = SnapshotDraft::from_texts(
            &customization.current_text,
            &text,
            meta(
                &request.actor,
                format!("revert sequences {}", join_sequences(skipped)),
            ),
        );
        let snapshot = stage_append(&mut batch, &mut customization, draft, Lifecycle::Finalized, now)?;
        let record = RollbackRecord {
            id: IdKind::RollbackRecord.generate(),
            customization_id: customization.id.clone(),
            from_seq,
            to_seq: snapshot.sequence,
            kind: RollbackKind::Selective,
            affected_snapshot_ids: affected,
            resulting_patch: snapshot.forward_patch.clone(),
            related_customization_id: None,
            reason: request.reason.clone(),
            actor: request.actor.clone(),
            created_at: now,
        };
        batch.record_rollback(record.clone());
        stage_customization(&mut batch, revision, &mut customization);
        self.store().commit(batch)?;

        Ok(RollbackResult {
            mode: RollbackMode::InPlace,
            customization,
            snapshot: Some(snapshot),
            record: Some(record),
        })
    }
}
