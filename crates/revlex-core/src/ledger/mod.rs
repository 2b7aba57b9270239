//! Snapshot ledger: ordered, lifecycle-tracked history per customization.

pub mod memory;
pub mod snapshot_ledger;
pub mod store;

pub use memory::MemoryLedgerStore;
pub use snapshot_ledger::{
    stage_amend, stage_append, stage_customization, stage_finalize, SnapshotDraft, SnapshotLedger,
};
pub use store::{LedgerBatch, LedgerStore, RevisionGuard, StoreResult};
