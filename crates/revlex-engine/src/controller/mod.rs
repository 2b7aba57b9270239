//! Version controller.
//!
//! Per customization the controller moves between two states:
//!
//! ```text
//!            apply_change                    finalize_open_snapshot
//!   only-finalized ─────────────► open-snapshot ───────────────────► only-finalized
//!                                   │      ▲
//!                                   └──────┘ apply_change (amend)
//! ```
//!
//! ## Critical sections
//!
//! Every read-then-write runs while holding the customization's mutex and
//! commits a single [`LedgerBatch`] guarded by the revision it read. A
//! `Concurrency` error (another process, or another controller over the
//! same store, got there first) re-runs the whole attempt with fresh state.
//! Operations on different customizations never contend.
//!
//! ## Logging
//!
//! Public operations emit `log_op_start!` / `log_op_end!` / `log_op_error!`;
//! retries and internal steps log at debug level only.

mod cherry_pick;
mod janitor_run;
mod rollback;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use revlex_core::conflict::{ConflictAnalyzer, ConflictReport};
use revlex_core::document::content_hash;
use revlex_core::errors::{ExError, ExErrorKind, RevlexError};
use revlex_core::ledger::{
    stage_amend, stage_append, stage_customization, stage_finalize, LedgerBatch, LedgerStore,
    SnapshotDraft, SnapshotLedger,
};
use revlex_core::model::{
    BranchOrigin, ChangeKind, ChangeMeta, Customization, CustomizationStatus, Lifecycle, Snapshot,
};
use revlex_core::patch::{apply, validate, Patch};
use revlex_core::{log_op_end, log_op_error, log_op_start};
use revlex_core_types::{IdKind, RequestId};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::Result;

pub use cherry_pick::CherryPickResult;
pub use janitor_run::JanitorReport;
pub use rollback::{RollbackMode, RollbackRequest, RollbackResult};

/// Result of an edit (`apply_change`, `commit_change`, `apply_patch`)
#[derive(Debug, Clone, Serialize)]
pub struct ChangeOutcome {
    pub customization_id: String,
    /// False when the requested text equals the current text; nothing was written
    pub changed: bool,
    /// The snapshot holding the edit (the open one when unchanged), if any
    pub snapshot: Option<Snapshot>,
    pub current_hash: String,
    /// Analyzer findings for patch-driven edits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ConflictReport>,
}

/// Outcome of replaying a customization's full history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub customization_id: String,
    pub snapshots_verified: usize,
    pub current_hash: String,
}

/// Versioned edits over an injected ledger store
pub struct VersionController<S: LedgerStore> {
    ledger: SnapshotLedger<S>,
    analyzer: ConflictAnalyzer,
    config: EngineConfig,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: LedgerStore> std::fmt::Debug for VersionController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionController")
            .field("config", &self.config)
            .field("analyzer", &self.analyzer)
            .finish_non_exhaustive()
    }
}

fn poisoned() -> ExError {
    ExError::new(ExErrorKind::Internal).with_message("customization lock poisoned")
}

/// Check that `text` hashes to `expected`
pub(crate) fn verify_hash(context: &str, expected: &str, text: &str) -> Result<()> {
    let actual = content_hash(text);
    if actual != expected {
        return Err(RevlexError::IntegrityMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            actual,
        }
        .into());
    }
    Ok(())
}

/// Fold `text` through the forward patches of `snapshots`, hash-checking
/// both ends of every step
pub(crate) fn replay<'a>(
    context: &str,
    text: &str,
    snapshots: impl IntoIterator<Item = &'a Snapshot>,
) -> Result<String> {
    let mut text = text.to_string();
    for snapshot in snapshots {
        let tag = |e: ExError| {
            e.with_op(context)
                .with_snapshot_id(&snapshot.id)
                .with_sequence(snapshot.sequence)
        };
        verify_hash(context, &snapshot.before_hash, &text).map_err(tag)?;
        text = apply(&snapshot.forward_patch, &text).map_err(|e| tag(e.into()))?;
        verify_hash(context, &snapshot.after_hash, &text).map_err(tag)?;
    }
    Ok(text)
}

impl<S: LedgerStore> VersionController<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            ledger: SnapshotLedger::new(store),
            analyzer: ConflictAnalyzer::new(),
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the analyzer used by `apply_patch` and `analyze`
    pub fn with_analyzer(mut self, analyzer: ConflictAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &SnapshotLedger<S> {
        &self.ledger
    }

    fn store(&self) -> &S {
        self.ledger.store()
    }

    // ----- plumbing -----

    fn customization_lock(&self, customization_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| poisoned())?;
        Ok(Arc::clone(
            locks.entry(customization_id.to_string()).or_default(),
        ))
    }

    /// Run `attempt` inside the customization's critical section, re-running
    /// it on `Concurrency` up to `max_commit_retries` times
    fn serialized<T>(
        &self,
        op: &'static str,
        customization_id: &str,
        mut attempt: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let lock = self.customization_lock(customization_id)?;
        let result = match lock.lock() {
            Ok(_guard) => self.with_retries(op, customization_id, &mut attempt),
            Err(_) => Err(poisoned()),
        };
        self.release_lock(customization_id, lock)?;
        result
    }

    fn with_retries<T>(
        &self,
        op: &'static str,
        customization_id: &str,
        attempt: &mut impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let mut retries = 0;
        loop {
            match attempt() {
                Err(err)
                    if err.kind().is_retryable() && retries < self.config.max_commit_retries =>
                {
                    retries += 1;
                    tracing::debug!(
                        component = "version_controller",
                        op,
                        customization_id,
                        retry = retries,
                        error = %err,
                        "commit lost a race, retrying"
                    );
                }
                result => return result,
            }
        }
    }

    /// Drop the map entry once no other caller holds or waits on it.
    /// Clones are only handed out under the map lock, so the count is exact.
    fn release_lock(&self, customization_id: &str, lock: Arc<Mutex<()>>) -> Result<()> {
        let mut locks = self.locks.lock().map_err(|_| poisoned())?;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(customization_id);
        }
        Ok(())
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    /// Wrap a public operation in start/end/error log events
    fn observed<T>(
        &self,
        op: &'static str,
        customization_id: &str,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let request_id = RequestId::new();
        log_op_start!(
            op,
            customization_id = customization_id,
            request_id = request_id.as_str()
        );
        let start = Instant::now();
        match f() {
            Ok(value) => {
                log_op_end!(
                    op,
                    duration_ms = start.elapsed().as_millis() as u64,
                    customization_id = customization_id
                );
                Ok(value)
            }
            Err(err) => {
                let err = err.with_request_id(request_id);
                log_op_error!(
                    op,
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                Err(err)
            }
        }
    }

    fn check_text(&self, what: &str, text: &str) -> Result<()> {
        let limit = self.config.limits.max_text_bytes;
        if text.len() > limit {
            return Err(RevlexError::InputTooLarge {
                what: what.to_string(),
                size: text.len(),
                limit,
            }
            .into());
        }
        Ok(())
    }

    fn check_patch(&self, patch: &Patch) -> Result<()> {
        let limit = self.config.limits.max_patch_ops;
        if patch.len() > limit {
            return Err(RevlexError::InputTooLarge {
                what: "patch".to_string(),
                size: patch.len(),
                limit,
            }
            .into());
        }
        let value_bytes: usize = patch
            .iter()
            .filter_map(|op| op.value.as_deref())
            .map(str::len)
            .sum();
        if value_bytes > self.config.limits.max_text_bytes {
            return Err(RevlexError::InputTooLarge {
                what: "patch values".to_string(),
                size: value_bytes,
                limit: self.config.limits.max_text_bytes,
            }
            .into());
        }
        Ok(())
    }

    fn load_active(&self, op: &str, customization_id: &str) -> Result<Customization> {
        let customization = self.ledger.customization(customization_id)?;
        if customization.is_archived() {
            return Err(ExError::from(RevlexError::CustomizationArchived {
                customization_id: customization_id.to_string(),
            })
            .with_op(op));
        }
        Ok(customization)
    }

    /// Stage finalization of the open snapshot, if there is one
    fn seal_open(
        &self,
        batch: &mut LedgerBatch,
        customization: &mut Customization,
        now: DateTime<Utc>,
    ) -> Result<Option<Snapshot>> {
        match customization.open_snapshot_id.clone() {
            Some(open_id) => {
                let open = self.ledger.snapshot(&open_id)?;
                Ok(stage_finalize(batch, customization, &open, now))
            }
            None => Ok(None),
        }
    }

    /// Stage a new customization with its finalized sequence-1 snapshot
    fn stage_new_customization(
        &self,
        batch: &mut LedgerBatch,
        baseline: &str,
        scope: &str,
        origin: Option<BranchOrigin>,
        meta: ChangeMeta,
    ) -> Result<(Customization, Snapshot)> {
        let mut customization = Customization::new(
            IdKind::Customization.generate(),
            scope.to_string(),
            baseline.to_string(),
        );
        customization.origin = origin;
        let now = customization.created_at;
        let draft = SnapshotDraft::from_texts(baseline, baseline, meta);
        let initial = stage_append(batch, &mut customization, draft, Lifecycle::Finalized, now)?;
        batch.put_customization(customization.clone());
        Ok((customization, initial))
    }

    // ----- lifecycle -----

    /// Create a customization whose sequence 1 is the baseline
    ///
    /// # Errors
    ///
    /// `InputTooLarge` if the baseline exceeds the text cap.
    pub fn create_customization(
        &self,
        baseline: &str,
        scope: &str,
        author: &str,
    ) -> Result<Customization> {
        log_op_start!("create_customization", scope = scope);
        let start = Instant::now();

        let result = self.create_customization_impl(baseline, scope, author);
        let elapsed = start.elapsed().as_millis() as u64;
        match &result {
            Ok(customization) => {
                log_op_end!(
                    "create_customization",
                    duration_ms = elapsed,
                    customization_id = customization.id.as_str()
                );
            }
            Err(err) => {
                log_op_error!("create_customization", err.clone(), duration_ms = elapsed);
            }
        }
        result
    }

    fn create_customization_impl(
        &self,
        baseline: &str,
        scope: &str,
        author: &str,
    ) -> Result<Customization> {
        self.check_text("baseline", baseline)?;
        let mut batch = LedgerBatch::new();
        let meta = ChangeMeta {
            kind: ChangeKind::Initial,
            author: author.to_string(),
            summary: Some("initial version".to_string()),
        };
        let (customization, _) =
            self.stage_new_customization(&mut batch, baseline, scope, None, meta)?;
        self.store().commit(batch)?;
        Ok(customization)
    }

    /// Create or amend the open snapshot so the current text becomes `text`.
    ///
    /// A text equal to the current text writes nothing.
    ///
    /// # Errors
    ///
    /// `IllegalState` for archived customizations, `InputTooLarge`, and
    /// `IntegrityMismatch` if the open snapshot no longer fits the current text.
    pub fn apply_change(
        &self,
        customization_id: &str,
        text: &str,
        meta: ChangeMeta,
    ) -> Result<ChangeOutcome> {
        self.observed("apply_change", customization_id, || {
            self.check_text("text", text)?;
            self.edit("apply_change", customization_id, &meta, false, &|_: &Customization| {
                Ok((text.to_string(), None))
            })
        })
    }

    /// Like [`apply_change`](Self::apply_change), but the resulting snapshot
    /// is finalized in the same commit
    ///
    /// # Errors
    ///
    /// As [`apply_change`](Self::apply_change).
    pub fn commit_change(
        &self,
        customization_id: &str,
        text: &str,
        meta: ChangeMeta,
    ) -> Result<ChangeOutcome> {
        self.observed("commit_change", customization_id, || {
            self.check_text("text", text)?;
            self.edit("commit_change", customization_id, &meta, true, &|_: &Customization| {
                Ok((text.to_string(), None))
            })
        })
    }

    /// Validate, screen and apply `patch` to the current text, then record
    /// the result like `apply_change`.
    ///
    /// # Errors
    ///
    /// - `MalformedPatch` / `PatchApplication` from the patch model
    /// - `ConflictBlocked` when the report reaches `block_severity` and `force` is false
    pub fn apply_patch(
        &self,
        customization_id: &str,
        patch: &Patch,
        meta: ChangeMeta,
        force: bool,
    ) -> Result<ChangeOutcome> {
        self.observed("apply_patch", customization_id, || {
            self.check_patch(patch)?;
            validate(patch)?;
            let threshold = self.config.block_severity;
            let screen_and_apply = |customization: &Customization| {
                let report = self.analyzer.analyze(patch, &customization.current_text);
                if !force && report.blocks_at(threshold) {
                    return Err(ExError::new(ExErrorKind::ConflictBlocked)
                        .with_op("apply_patch")
                        .with_customization_id(&customization.id)
                        .with_message(format!(
                            "analysis severity {} reaches block threshold {} ({} conflicts, {} warnings)",
                            report.severity,
                            threshold,
                            report.conflicts.len(),
                            report.warnings.len()
                        )));
                }
                let text = apply(patch, &customization.current_text)?;
                Ok((text, Some(report)))
            };
            self.edit("apply_patch", customization_id, &meta, false, &screen_and_apply)
        })
    }

    /// Shared body of the edit operations
    fn edit(
        &self,
        op: &'static str,
        customization_id: &str,
        meta: &ChangeMeta,
        finalize: bool,
        produce: &dyn Fn(&Customization) -> Result<(String, Option<ConflictReport>)>,
    ) -> Result<ChangeOutcome> {
        self.serialized(op, customization_id, || {
            let mut customization = self.load_active(op, customization_id)?;
            let (text, report) = produce(&customization)?;
            self.check_text("text", &text)?;

            let revision = customization.revision;
            let now = Utc::now();
            let mut batch = LedgerBatch::new();
            let open = match customization.open_snapshot_id.clone() {
                Some(id) => Some(self.ledger.snapshot(&id)?),
                None => None,
            };
            let changed = text != customization.current_text;

            let mut snapshot = match (open, changed) {
                (open, false) => open,
                (Some(open), true) => Some(stage_amend(
                    &mut batch,
                    &mut customization,
                    &open,
                    &text,
                    meta.clone(),
                    now,
                )?),
                (None, true) => {
                    let draft =
                        SnapshotDraft::from_texts(&customization.current_text, &text, meta.clone());
                    let lifecycle = if finalize {
                        Lifecycle::Finalized
                    } else {
                        Lifecycle::Open
                    };
                    Some(stage_append(&mut batch, &mut customization, draft, lifecycle, now)?)
                }
            };

            if finalize {
                if let Some(sealed) = snapshot
                    .as_ref()
                    .and_then(|s| stage_finalize(&mut batch, &mut customization, s, now))
                {
                    snapshot = Some(sealed);
                }
            }

            if !batch.is_empty() {
                stage_customization(&mut batch, revision, &mut customization);
                self.store().commit(batch)?;
            }

            Ok(ChangeOutcome {
                customization_id: customization.id,
                changed,
                snapshot,
                current_hash: customization.current_hash,
                report,
            })
        })
    }

    /// Record an explicit `before -> after` edit as a new finalized snapshot.
    ///
    /// `before` must be the current text. Any open snapshot is finalized in
    /// the same commit. Identical texts write nothing and return `None`.
    ///
    /// # Errors
    ///
    /// `IntegrityMismatch` if `before` is not the current text.
    pub fn create_snapshot(
        &self,
        customization_id: &str,
        before: &str,
        after: &str,
        meta: ChangeMeta,
    ) -> Result<Option<Snapshot>> {
        self.observed("create_snapshot", customization_id, || {
            self.check_text("before", before)?;
            self.check_text("after", after)?;
            self.serialized("create_snapshot", customization_id, || {
                let mut customization = self.load_active("create_snapshot", customization_id)?;
                verify_hash("create_snapshot", &customization.current_hash, before)
                    .map_err(|e| e.with_customization_id(customization_id))?;
                if before == after {
                    return Ok(None);
                }

                let revision = customization.revision;
                let now = Utc::now();
                let mut batch = LedgerBatch::new();
                self.seal_open(&mut batch, &mut customization, now)?;
                let draft = SnapshotDraft::from_texts(before, after, meta.clone());
                let snapshot =
                    stage_append(&mut batch, &mut customization, draft, Lifecycle::Finalized, now)?;
                stage_customization(&mut batch, revision, &mut customization);
                self.store().commit(batch)?;
                Ok(Some(snapshot))
            })
        })
    }

    /// Finalize the open snapshot. Returns `None` when there is none, so a
    /// second call without an intervening edit changes nothing.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown customization.
    pub fn finalize_open_snapshot(&self, customization_id: &str) -> Result<Option<Snapshot>> {
        self.observed("finalize_open_snapshot", customization_id, || {
            self.serialized("finalize_open_snapshot", customization_id, || {
                let mut customization = self.ledger.customization(customization_id)?;
                let revision = customization.revision;
                let mut batch = LedgerBatch::new();
                let sealed = self.seal_open(&mut batch, &mut customization, Utc::now())?;
                if sealed.is_some() {
                    stage_customization(&mut batch, revision, &mut customization);
                    self.store().commit(batch)?;
                }
                Ok(sealed)
            })
        })
    }

    /// Archive a customization; its open snapshot is finalized first.
    /// Archiving twice is a no-op.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown customization.
    pub fn archive_customization(&self, customization_id: &str) -> Result<Customization> {
        self.observed("archive_customization", customization_id, || {
            self.serialized("archive_customization", customization_id, || {
                let mut customization = self.ledger.customization(customization_id)?;
                if customization.is_archived() {
                    return Ok(customization);
                }
                let revision = customization.revision;
                let now = Utc::now();
                let mut batch = LedgerBatch::new();
                self.seal_open(&mut batch, &mut customization, now)?;
                customization.status = CustomizationStatus::Archived;
                customization.updated_at = now;
                stage_customization(&mut batch, revision, &mut customization);
                self.store().commit(batch)?;
                Ok(customization)
            })
        })
    }

    // ----- reads -----

    /// Screen `patch` against the current text without applying it
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown customization.
    pub fn analyze(&self, customization_id: &str, patch: &Patch) -> Result<ConflictReport> {
        let customization = self.ledger.customization(customization_id)?;
        Ok(self.analyzer.analyze(patch, &customization.current_text))
    }

    pub fn customization(&self, customization_id: &str) -> Result<Customization> {
        self.ledger.customization(customization_id)
    }

    /// Snapshots ordered by sequence
    pub fn history(&self, customization_id: &str) -> Result<Vec<Snapshot>> {
        self.ledger.list(customization_id)
    }

    /// Text as of `sequence`, rebuilt from the baseline
    ///
    /// # Errors
    ///
    /// `SnapshotNotFound` if no snapshot has that sequence; `IntegrityMismatch`
    /// if a stored delta does not reproduce its recorded hashes.
    pub fn reconstruct(&self, customization_id: &str, sequence: u64) -> Result<String> {
        let customization = self.ledger.customization(customization_id)?;
        let snapshots = self.ledger.list(customization_id)?;
        if !snapshots.iter().any(|s| s.sequence == sequence) {
            return Err(ExError::new(ExErrorKind::SnapshotNotFound)
                .with_op("reconstruct")
                .with_customization_id(customization_id)
                .with_sequence(sequence)
                .with_message("no snapshot at this sequence"));
        }
        replay(
            "reconstruct",
            &customization.baseline_text,
            snapshots.iter().take_while(|s| s.sequence <= sequence),
        )
    }

    /// Check that the baseline folded through every forward patch gives the
    /// current text
    ///
    /// # Errors
    ///
    /// `IntegrityMismatch` describing the first failing step.
    pub fn verify_integrity(&self, customization_id: &str) -> Result<IntegrityReport> {
        self.observed("verify_integrity", customization_id, || {
            let customization = self.ledger.customization(customization_id)?;
            let snapshots = self.ledger.list(customization_id)?;
            let text = replay("verify_integrity", &customization.baseline_text, &snapshots)?;
            verify_hash("verify_integrity", &customization.current_hash, &text)
                .and_then(|_| {
                    verify_hash(
                        "verify_integrity",
                        &customization.current_hash,
                        &customization.current_text,
                    )
                })
                .map_err(|e| e.with_customization_id(customization_id))?;
            Ok(IntegrityReport {
                customization_id: customization.id,
                snapshots_verified: snapshots.len(),
                current_hash: customization.current_hash,
            })
        })
    }

    /// One human-readable line per snapshot
    pub fn change_log(&self, customization_id: &str) -> Result<Vec<String>> {
        Ok(self
            .ledger
            .list(customization_id)?
            .iter()
            .map(|s| {
                format!(
                    "#{} [{}/{}] {} by {}: {}",
                    s.sequence,
                    s.kind.as_str(),
                    s.lifecycle.as_str(),
                    s.created_at.format("%Y-%m-%d %H:%M:%S"),
                    s.author,
                    s.summary
                )
            })
            .collect())
    }
}
