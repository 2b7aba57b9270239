//! Canonical schema constants for structured logging and events
//!
//! These constants keep log fields consistent between the core, store and
//! engine crates.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Entity identifiers
pub const FIELD_CUSTOMIZATION_ID: &str = "customization_id";
pub const FIELD_SNAPSHOT_ID: &str = "snapshot_id";
pub const FIELD_SEQUENCE: &str = "sequence";

// Collection sizes
pub const FIELD_OP_COUNT: &str = "op_count";
pub const FIELD_CHANGE_COUNT: &str = "change_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
