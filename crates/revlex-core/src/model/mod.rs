pub mod customization;
pub mod rollback;
pub mod snapshot;

pub use customization::{BranchOrigin, Customization, CustomizationStatus};
pub use rollback::{RollbackKind, RollbackRecord};
pub use snapshot::{ChangeKind, ChangeMeta, Lifecycle, Snapshot};
