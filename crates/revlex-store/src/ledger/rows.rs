//! Row <-> model conversion
//!
//! Rows are read into plain structs first so decoding failures surface as
//! `ExError` instead of being squeezed through `rusqlite::Error`.

use chrono::{DateTime, SecondsFormat, Utc};
use revlex_core::model::{
    BranchOrigin, ChangeKind, Customization, CustomizationStatus, Lifecycle, RollbackKind,
    RollbackRecord, Snapshot,
};
use revlex_core::patch::Patch;
use rusqlite::Row;

use crate::errors::{corrupt_row, serialization_error, Result};

pub(crate) const CUSTOMIZATION_COLUMNS: &str = "id, scope, baseline_text, current_text, current_hash, status, \
     open_snapshot_id, head_sequence, origin_customization_id, origin_sequence, revision, \
     created_at, updated_at";

pub(crate) const SNAPSHOT_COLUMNS: &str = "id, customization_id, sequence, kind, forward_patch, \
     inverse_patch, before_hash, after_hash, lifecycle, author, summary, created_at, updated_at";

pub(crate) const ROLLBACK_COLUMNS: &str = "id, customization_id, from_seq, to_seq, kind, \
     affected_snapshot_ids, resulting_patch, related_customization_id, reason, actor, created_at";

pub(crate) fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(table: &str, column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| corrupt_row(table, column, value))
}

fn to_u64(table: &str, column: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| corrupt_row(table, column, &value.to_string()))
}

pub(crate) fn patch_json(column: &str, patch: &Patch) -> Result<String> {
    serde_json::to_string(patch).map_err(|e| serialization_error(column, e))
}

fn parse_patch(column: &str, json: &str) -> Result<Patch> {
    serde_json::from_str(json).map_err(|e| serialization_error(column, e))
}

pub(crate) struct CustomizationRow {
    id: String,
    scope: String,
    baseline_text: String,
    current_text: String,
    current_hash: String,
    status: String,
    open_snapshot_id: Option<String>,
    head_sequence: i64,
    origin_customization_id: Option<String>,
    origin_sequence: Option<i64>,
    revision: i64,
    created_at: String,
    updated_at: String,
}

impl CustomizationRow {
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            scope: row.get(1)?,
            baseline_text: row.get(2)?,
            current_text: row.get(3)?,
            current_hash: row.get(4)?,
            status: row.get(5)?,
            open_snapshot_id: row.get(6)?,
            head_sequence: row.get(7)?,
            origin_customization_id: row.get(8)?,
            origin_sequence: row.get(9)?,
            revision: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    pub(crate) fn into_model(self) -> Result<Customization> {
        const T: &str = "customizations";
        let status = CustomizationStatus::parse(&self.status)
            .ok_or_else(|| corrupt_row(T, "status", &self.status))?;
        let origin = match (self.origin_customization_id, self.origin_sequence) {
            (Some(customization_id), Some(sequence)) => Some(BranchOrigin {
                customization_id,
                sequence: to_u64(T, "origin_sequence", sequence)?,
            }),
            _ => None,
        };
        Ok(Customization {
            scope: self.scope,
            baseline_text: self.baseline_text,
            current_text: self.current_text,
            current_hash: self.current_hash,
            status,
            open_snapshot_id: self.open_snapshot_id,
            head_sequence: to_u64(T, "head_sequence", self.head_sequence)?,
            origin,
            revision: to_u64(T, "revision", self.revision)?,
            created_at: parse_time(T, "created_at", &self.created_at)?,
            updated_at: parse_time(T, "updated_at", &self.updated_at)?,
            id: self.id,
        })
    }
}

pub(crate) struct SnapshotRow {
    id: String,
    customization_id: String,
    sequence: i64,
    kind: String,
    forward_patch: String,
    inverse_patch: String,
    before_hash: String,
    after_hash: String,
    lifecycle: String,
    author: String,
    summary: String,
    created_at: String,
    updated_at: String,
}

impl SnapshotRow {
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            customization_id: row.get(1)?,
            sequence: row.get(2)?,
            kind: row.get(3)?,
            forward_patch: row.get(4)?,
            inverse_patch: row.get(5)?,
            before_hash: row.get(6)?,
            after_hash: row.get(7)?,
            lifecycle: row.get(8)?,
            author: row.get(9)?,
            summary: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    pub(crate) fn into_model(self) -> Result<Snapshot> {
        const T: &str = "snapshots";
        Ok(Snapshot {
            sequence: to_u64(T, "sequence", self.sequence)?,
            kind: ChangeKind::parse(&self.kind).ok_or_else(|| corrupt_row(T, "kind", &self.kind))?,
            forward_patch: parse_patch("snapshots.forward_patch", &self.forward_patch)?,
            inverse_patch: parse_patch("snapshots.inverse_patch", &self.inverse_patch)?,
            lifecycle: Lifecycle::parse(&self.lifecycle)
                .ok_or_else(|| corrupt_row(T, "lifecycle", &self.lifecycle))?,
            created_at: parse_time(T, "created_at", &self.created_at)?,
            updated_at: parse_time(T, "updated_at", &self.updated_at)?,
            id: self.id,
            customization_id: self.customization_id,
            before_hash: self.before_hash,
            after_hash: self.after_hash,
            author: self.author,
            summary: self.summary,
        })
    }
}

pub(crate) struct RollbackRow {
    id: String,
    customization_id: String,
    from_seq: i64,
    to_seq: i64,
    kind: String,
    affected_snapshot_ids: String,
    resulting_patch: String,
    related_customization_id: Option<String>,
    reason: Option<String>,
    actor: String,
    created_at: String,
}

impl RollbackRow {
    pub(crate) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            customization_id: row.get(1)?,
            from_seq: row.get(2)?,
            to_seq: row.get(3)?,
            kind: row.get(4)?,
            affected_snapshot_ids: row.get(5)?,
            resulting_patch: row.get(6)?,
            related_customization_id: row.get(7)?,
            reason: row.get(8)?,
            actor: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    pub(crate) fn into_model(self) -> Result<RollbackRecord> {
        const T: &str = "rollback_records";
        Ok(RollbackRecord {
            from_seq: to_u64(T, "from_seq", self.from_seq)?,
            to_seq: to_u64(T, "to_seq", self.to_seq)?,
            kind: RollbackKind::parse(&self.kind).ok_or_else(|| corrupt_row(T, "kind", &self.kind))?,
            affected_snapshot_ids: serde_json::from_str(&self.affected_snapshot_ids)
                .map_err(|e| serialization_error("rollback_records.affected_snapshot_ids", e))?,
            resulting_patch: parse_patch("rollback_records.resulting_patch", &self.resulting_patch)?,
            created_at: parse_time(T, "created_at", &self.created_at)?,
            id: self.id,
            customization_id: self.customization_id,
            related_customization_id: self.related_customization_id,
            reason: self.reason,
            actor: self.actor,
        })
    }
}
