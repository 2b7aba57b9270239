//! Expunging abandoned work.

use chrono::{DateTime, Utc};
use revlex_core::ledger::{stage_customization, LedgerBatch, LedgerStore};
use revlex_core::model::Customization;
use revlex_core::patch::apply;
use serde::Serialize;

use super::{verify_hash, VersionController};
use crate::Result;

/// What one janitor pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JanitorReport {
    pub expunged_snapshots: Vec<String>,
    pub expunged_customizations: Vec<String>,
    /// Customizations skipped because of an error (logged)
    pub failures: usize,
}

fn idle_longer_than(now: DateTime<Utc>, since: DateTime<Utc>, ttl_secs: u64) -> bool {
    u64::try_from(now.signed_duration_since(since).num_seconds()).map_or(false, |age| age > ttl_secs)
}

impl<S: LedgerStore> VersionController<S> {
    /// One housekeeping pass as of `now`.
    ///
    /// Open snapshots idle longer than `open_snapshot_ttl_secs` are deleted
    /// and their change is reverted from the current text. When
    /// `expunge_customizations` is set, customizations that never got past
    /// their initial snapshot and are idle longer than
    /// `customization_ttl_secs` are deleted. A failure on one customization
    /// is logged and does not stop the pass.
    ///
    /// # Errors
    ///
    /// Only if the customization list cannot be read.
    pub fn run_janitor(&self, now: DateTime<Utc>) -> Result<JanitorReport> {
        let mut report = JanitorReport::default();
        for customization in self.store().list_customizations()? {
            let id = customization.id.clone();
            match self.serialized("janitor", &id, || self.janitor_attempt(&id, now)) {
                Ok(Janitored::OpenSnapshot(snapshot_id)) => report.expunged_snapshots.push(snapshot_id),
                Ok(Janitored::Customization) => report.expunged_customizations.push(id),
                Ok(Janitored::Nothing) => {}
                Err(err) => {
                    report.failures += 1;
                    tracing::warn!(
                        component = "janitor",
                        customization_id = %id,
                        error = %err,
                        "janitor skipped customization"
                    );
                }
            }
        }
        if !report.expunged_snapshots.is_empty() || !report.expunged_customizations.is_empty() {
            tracing::info!(
                component = "janitor",
                expunged_snapshots = report.expunged_snapshots.len(),
                expunged_customizations = report.expunged_customizations.len(),
                "janitor pass finished"
            );
        }
        Ok(report)
    }

    fn janitor_attempt(&self, customization_id: &str, now: DateTime<Utc>) -> Result<Janitored> {
        let Some(mut customization) = self.store().get_customization(customization_id)? else {
            return Ok(Janitored::Nothing);
        };
        let ttl = &self.config.janitor;

        if let Some(open_id) = customization.open_snapshot_id.clone() {
            let open = self.ledger.snapshot(&open_id)?;
            if !idle_longer_than(now, open.updated_at, ttl.open_snapshot_ttl_secs) {
                return Ok(Janitored::Nothing);
            }
            let before = apply(&open.inverse_patch, &customization.current_text)?;
            verify_hash("janitor", &open.before_hash, &before)
                .map_err(|e| e.with_snapshot_id(&open.id))?;

            let revision = customization.revision;
            let mut batch = LedgerBatch::new();
            batch.delete_snapshot(open.id.clone());
            customization.open_snapshot_id = None;
            customization.head_sequence = open.sequence - 1;
            customization.set_current_text(before, now);
            stage_customization(&mut batch, revision, &mut customization);
            self.store().commit(batch)?;
            return Ok(Janitored::OpenSnapshot(open.id));
        }

        if ttl.expunge_customizations && is_untouched(&customization)
            && idle_longer_than(now, customization.updated_at, ttl.customization_ttl_secs)
        {
            let mut batch = LedgerBatch::new();
            batch
                .guard(customization.id.clone(), customization.revision)
                .delete_customization(customization.id.clone());
            self.store().commit(batch)?;
            return Ok(Janitored::Customization);
        }
        Ok(Janitored::Nothing)
    }
}

enum Janitored {
    Nothing,
    OpenSnapshot(String),
    Customization,
}

/// Only the initial snapshot exists
fn is_untouched(customization: &Customization) -> bool {
    customization.head_sequence <= 1 && customization.open_snapshot_id.is_none()
}
