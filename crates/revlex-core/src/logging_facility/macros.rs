//! Operation boundary macros.
//!
//! Every boundary event carries `component` (the calling module), `op` and
//! `event`, so a log reader can pair the `start` of an operation with its
//! `end` or `end_error`. Extra `key = value` fields pass straight through to
//! `tracing`.

#[doc(hidden)]
#[macro_export]
macro_rules! __revlex_boundary {
    ($level:ident, $op:expr, $event:ident $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::$event,
            $($($field)*)?
        )
    };
}

/// ```
/// # use revlex_core::log_op_start;
/// log_op_start!("apply_change", customization_id = "cust:1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__revlex_boundary!(info, $op, EVENT_START $(, $($field)*)?)
    };
}

/// ```
/// # use revlex_core::log_op_end;
/// log_op_end!("apply_change", duration_ms = 42, sequence = 3u64);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__revlex_boundary!(info, $op, EVENT_END, duration_ms = $duration $(, $($field)*)?)
    };
}

/// Failed end of an operation. `$err` is anything convertible into
/// `ExError`; its kind, code and message become fields.
///
/// ```
/// # use revlex_core::{log_op_error, errors::RevlexError};
/// let err = RevlexError::SnapshotNotFound { snapshot_id: "snap:1".to_string() };
/// log_op_error!("finalize", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__revlex_boundary!(
            error,
            $op,
            EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            err_message = ex_err.message()
            $(, $($field)*)?
        );
    }};
}
