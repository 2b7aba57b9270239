//! `{success, data?, error?, details?}` envelope handed to callers.

use revlex_core::errors::ExError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Error half of an [`Outcome`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeError {
    /// Stable `ERR_*` code
    pub code: String,
    pub kind: String,
    pub message: String,
}

/// Uniform result shape for collaborators that cannot consume `Result`
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OutcomeError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Context fields carried by the error, if any
fn error_details(err: &ExError) -> Option<Value> {
    let mut map = Map::new();
    if let Some(op) = err.op() {
        map.insert("op".into(), Value::from(op));
    }
    if let Some(id) = err.customization_id() {
        map.insert("customization_id".into(), Value::from(id));
    }
    if let Some(id) = err.snapshot_id() {
        map.insert("snapshot_id".into(), Value::from(id));
    }
    if let Some(sequence) = err.sequence() {
        map.insert("sequence".into(), Value::from(sequence));
    }
    if let Some(index) = err.op_index() {
        map.insert("failed_op_index".into(), Value::from(index));
    }
    if let Some(request_id) = err.request_id() {
        map.insert("request_id".into(), Value::from(request_id.as_str()));
    }
    (!map.is_empty()).then_some(Value::Object(map))
}

impl<T> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
        }
    }

    pub fn failure(err: &ExError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(OutcomeError {
                code: err.code().to_string(),
                kind: format!("{:?}", err.kind()),
                message: err.to_string(),
            }),
            details: error_details(err),
        }
    }

    /// Attach extra details, merging into any error context already present
    pub fn with_details(mut self, extra: Value) -> Self {
        self.details = match (self.details.take(), extra) {
            (Some(Value::Object(mut base)), Value::Object(more)) => {
                base.extend(more);
                Some(Value::Object(base))
            }
            (_, extra) => Some(extra),
        };
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl<T> From<Result<T, ExError>> for Outcome<T> {
    fn from(result: Result<T, ExError>) -> Self {
        match result {
            Ok(data) => Outcome::ok(data),
            Err(err) => Outcome::failure(&err),
        }
    }
}
