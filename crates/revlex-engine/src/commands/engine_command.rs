//! Engine-level commands dispatched to the version controller.
//!
//! Front ends (the CLI, a future service) build an [`EngineCommand`] and
//! hand it to [`apply_engine_command`] instead of calling controller
//! methods one by one.

use revlex_core::ledger::LedgerStore;
use revlex_core::model::{ChangeMeta, Snapshot};
use revlex_core::patch::Patch;
use serde::Serialize;

use crate::controller::{
    ChangeOutcome, CherryPickResult, RollbackMode, RollbackRequest, RollbackResult,
    VersionController,
};
use crate::Result;

/// Mutating engine commands
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Replace the current text, amending or opening a snapshot
    ApplyChange {
        customization_id: String,
        text: String,
        meta: ChangeMeta,
        /// Finalize the resulting snapshot in the same commit
        finalize: bool,
    },
    ApplyPatch {
        customization_id: String,
        patch: Patch,
        meta: ChangeMeta,
        /// Apply even when the analysis reaches the block threshold
        force: bool,
    },
    Finalize {
        customization_id: String,
    },
    Rollback {
        customization_id: String,
        target_seq: u64,
        mode: RollbackMode,
        request: RollbackRequest,
    },
    /// Selective rollback of the given sequences
    Revert {
        customization_id: String,
        sequences: Vec<u64>,
        request: RollbackRequest,
    },
    CherryPick {
        source_id: String,
        sequences: Vec<u64>,
        target_id: String,
        actor: String,
    },
}

impl EngineCommand {
    /// Operation name used in logs and error envelopes
    pub fn op_name(&self) -> &'static str {
        match self {
            EngineCommand::ApplyChange { finalize: false, .. } => "apply_change",
            EngineCommand::ApplyChange { finalize: true, .. } => "commit_change",
            EngineCommand::ApplyPatch { .. } => "apply_patch",
            EngineCommand::Finalize { .. } => "finalize_open_snapshot",
            EngineCommand::Rollback { .. } => "rollback",
            EngineCommand::Revert { .. } => "revert_snapshots",
            EngineCommand::CherryPick { .. } => "cherry_pick",
        }
    }
}

/// Result of applying an engine command
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EngineCommandResult {
    Change(ChangeOutcome),
    /// The finalized snapshot, or `None` when nothing was open
    Finalized(Option<Snapshot>),
    Rollback(RollbackResult),
    CherryPick(CherryPickResult),
}

/// Apply one engine command
///
/// # Errors
///
/// Whatever the underlying controller operation returns.
pub fn apply_engine_command<S: LedgerStore>(
    controller: &VersionController<S>,
    cmd: EngineCommand,
) -> Result<EngineCommandResult> {
    match cmd {
        EngineCommand::ApplyChange {
            customization_id,
            text,
            meta,
            finalize,
        } => {
            let outcome = if finalize {
                controller.commit_change(&customization_id, &text, meta)?
            } else {
                controller.apply_change(&customization_id, &text, meta)?
            };
            Ok(EngineCommandResult::Change(outcome))
        }
        EngineCommand::ApplyPatch {
            customization_id,
            patch,
            meta,
            force,
        } => controller
            .apply_patch(&customization_id, &patch, meta, force)
            .map(EngineCommandResult::Change),
        EngineCommand::Finalize { customization_id } => controller
            .finalize_open_snapshot(&customization_id)
            .map(EngineCommandResult::Finalized),
        EngineCommand::Rollback {
            customization_id,
            target_seq,
            mode,
            request,
        } => controller
            .rollback(&customization_id, target_seq, mode, request)
            .map(EngineCommandResult::Rollback),
        EngineCommand::Revert {
            customization_id,
            sequences,
            request,
        } => controller
            .revert_snapshots(&customization_id, &sequences, request)
            .map(EngineCommandResult::Rollback),
        EngineCommand::CherryPick {
            source_id,
            sequences,
            target_id,
            actor,
        } => controller
            .cherry_pick(&source_id, &sequences, &target_id, &actor)
            .map(EngineCommandResult::CherryPick),
    }
}
