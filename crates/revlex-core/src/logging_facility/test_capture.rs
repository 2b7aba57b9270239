//! In-memory capture of boundary events for tests.
//!
//! The capture layer is installed once as the process-wide subscriber, so
//! tests sharing a binary see each other's events. Filter by op name or by
//! an entity id rather than counting everything.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::core_types::schema::{FIELD_CUSTOMIZATION_ID, FIELD_ERR_CODE, FIELD_EVENT, FIELD_OP};

/// One recorded event; every field value is kept in its display form
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(FIELD_OP)
    }

    pub fn event(&self) -> Option<&str> {
        self.field(FIELD_EVENT)
    }

    pub fn err_code(&self) -> Option<&str> {
        self.field(FIELD_ERR_CODE)
    }

    /// True for the `event` boundary of `op`
    pub fn is(&self, op: &str, event: &str) -> bool {
        self.op() == Some(op) && self.event() == Some(event)
    }

    pub fn concerns(&self, customization_id: &str) -> bool {
        self.field(FIELD_CUSTOMIZATION_ID) == Some(customization_id)
    }
}

struct FieldRecorder<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldRecorder<'_> {
    // Integers and bools arrive here through the default `record_*` methods
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

type Buffer = Arc<Mutex<Vec<CapturedEvent>>>;

struct CaptureLayer {
    buffer: Buffer,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut FieldRecorder(&mut fields));
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            fields,
        };
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push(captured);
        }
    }
}

/// Read handle onto the shared buffer
#[derive(Clone)]
pub struct TestCapture {
    buffer: Buffer,
}

impl TestCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.buffer
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }

    pub fn for_op(&self, op: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.op() == Some(op))
    }

    /// The `event` boundaries of `op`, oldest first
    pub fn boundaries(&self, op: &str, event: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.is(op, event))
    }

    pub fn matching(&self, predicate: impl Fn(&CapturedEvent) -> bool) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| predicate(e)).collect()
    }

    /// # Panics
    ///
    /// When no `event` boundary of `op` has been captured.
    pub fn assert_boundary(&self, op: &str, event: &str) {
        let seen = self.events();
        assert!(
            seen.iter().any(|e| e.is(op, event)),
            "no {} event for op {} among {} captured events",
            event,
            op,
            seen.len()
        );
    }
}

static CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture subscriber (first call only) and return its handle.
///
/// ```
/// use revlex_core::log_op_start;
/// use revlex_core::logging_facility::init_test_capture;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_capture_op");
/// capture.assert_boundary("doc_capture_op", "start");
/// ```
pub fn init_test_capture() -> TestCapture {
    CAPTURE
        .get_or_init(|| {
            let buffer = Buffer::default();
            let layer = CaptureLayer {
                buffer: buffer.clone(),
            };
            // Another subscriber may already own the process; events are then
            // simply not captured.
            let _ = tracing_subscriber::registry().with(layer).try_init();
            TestCapture { buffer }
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let mut fields = BTreeMap::new();
        fields.insert("op".to_string(), "finalize".to_string());
        fields.insert("event".to_string(), "end_error".to_string());
        fields.insert("customization_id".to_string(), "cust:1".to_string());
        fields.insert("err_code".to_string(), "ERR_NOT_FOUND".to_string());
        let event = CapturedEvent {
            level: Level::ERROR,
            fields,
        };

        assert!(event.is("finalize", "end_error"));
        assert!(!event.is("finalize", "end"));
        assert!(event.concerns("cust:1"));
        assert_eq!(event.err_code(), Some("ERR_NOT_FOUND"));
    }
}
