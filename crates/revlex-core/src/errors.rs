use revlex_core_types::RequestId;
use thiserror::Error;

/// Result type alias using RevlexError
pub type Result<T> = std::result::Result<T, RevlexError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used for programmatic handling,
/// tests and the `{success, error}` envelope returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    InputTooLarge,
    MalformedPatch,

    // Application
    PatchApplication,
    DeltaApplication,

    // Integrity
    IntegrityMismatch,

    // Lookup
    NotFound,
    SnapshotNotFound,
    RollbackTargetNotFound,

    // Lifecycle
    IllegalState,
    ConflictBlocked,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    Concurrency,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InputTooLarge => "ERR_INPUT_TOO_LARGE",
            ExErrorKind::MalformedPatch => "ERR_MALFORMED_PATCH",
            ExErrorKind::PatchApplication => "ERR_PATCH_APPLICATION",
            ExErrorKind::DeltaApplication => "ERR_DELTA_APPLICATION",
            ExErrorKind::IntegrityMismatch => "ERR_INTEGRITY_MISMATCH",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::SnapshotNotFound => "ERR_SNAPSHOT_NOT_FOUND",
            ExErrorKind::RollbackTargetNotFound => "ERR_ROLLBACK_TARGET_NOT_FOUND",
            ExErrorKind::IllegalState => "ERR_ILLEGAL_STATE",
            ExErrorKind::ConflictBlocked => "ERR_CONFLICT_BLOCKED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether the version controller may retry an operation that failed with this kind
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExErrorKind::Concurrency)
    }
}

/// Canonical structured error type
///
/// Store and engine layers return this type. It carries a classification
/// kind plus optional context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    customization_id: Option<String>,
    snapshot_id: Option<String>,
    sequence: Option<u64>,
    op_index: Option<usize>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            customization_id: None,
            snapshot_id: None,
            sequence: None,
            op_index: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add customization context
    pub fn with_customization_id(mut self, id: impl Into<String>) -> Self {
        self.customization_id = Some(id.into());
        self
    }

    /// Add snapshot context
    pub fn with_snapshot_id(mut self, id: impl Into<String>) -> Self {
        self.snapshot_id = Some(id.into());
        self
    }

    /// Add sequence number context
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Add the index of the failing patch operation
    pub fn with_op_index(mut self, index: usize) -> Self {
        self.op_index = Some(index);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn customization_id(&self) -> Option<&str> {
        self.customization_id.as_deref()
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn op_index(&self) -> Option<usize> {
        self.op_index
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(id) = &self.customization_id {
            write!(f, " (customization_id: {})", id)?;
        }
        if let Some(id) = &self.snapshot_id {
            write!(f, " (snapshot_id: {})", id)?;
        }
        if let Some(sequence) = self.sequence {
            write!(f, " (sequence: {})", sequence)?;
        }
        if let Some(index) = self.op_index {
            write!(f, " (op_index: {})", index)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Why a structurally valid patch could not be applied to a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchFailure {
    /// Addressed line is outside the document
    IndexOutOfRange { index: usize, len: usize },
    /// A `test` operation found different content
    TestFailed {
        index: usize,
        expected: String,
        actual: String,
    },
}

impl std::fmt::Display for PatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchFailure::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range for document of {} lines", index, len)
            }
            PatchFailure::TestFailed {
                index,
                expected,
                actual,
            } => write!(
                f,
                "test failed at line {}: expected {:?}, found {:?}",
                index, expected, actual
            ),
        }
    }
}

/// Error taxonomy for the diff, patch and ledger components
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RevlexError {
    // ===== Patch Errors =====
    /// Operation is structurally invalid (bad path, missing value/from)
    #[error("Malformed patch operation {op_index}: {reason}")]
    MalformedPatch { op_index: usize, reason: String },

    /// Operation is valid but cannot be applied to the current document
    #[error("Patch operation {failed_op_index} failed: {reason}")]
    PatchApplication {
        failed_op_index: usize,
        reason: PatchFailure,
    },

    // ===== Delta Errors =====
    /// A line or unified delta could not be replayed against the given text
    #[error("Delta application failed at line {line}: {reason}")]
    DeltaApplication { line: usize, reason: String },

    /// Unified diff text could not be parsed
    #[error("Invalid unified diff at line {line}: {reason}")]
    InvalidUnifiedDiff { line: usize, reason: String },

    // ===== Integrity Errors =====
    /// A content hash check failed after apply, rollback or cherry-pick
    #[error("Integrity mismatch during {context}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// Sequence number race at commit time
    #[error("Concurrent modification of customization {customization_id} at sequence {sequence}")]
    ConcurrentModification {
        customization_id: String,
        sequence: u64,
    },

    // ===== Lookup Errors =====
    #[error("Customization not found: {customization_id}")]
    CustomizationNotFound { customization_id: String },

    #[error("Snapshot not found: {snapshot_id}")]
    SnapshotNotFound { snapshot_id: String },

    /// Rollback target sequence does not name a finalized snapshot
    #[error("Rollback target {sequence} not found in customization {customization_id}")]
    RollbackTargetNotFound {
        customization_id: String,
        sequence: u64,
    },

    // ===== Lifecycle Errors =====
    /// Finalized snapshots cannot be amended
    #[error("Snapshot {snapshot_id} is finalized and cannot be amended")]
    SnapshotFinalized { snapshot_id: String },

    /// Operation requires a finalized snapshot
    #[error("Snapshot {snapshot_id} is still open")]
    SnapshotNotFinalized { snapshot_id: String },

    /// Customization is archived and rejects edits
    #[error("Customization {customization_id} is archived")]
    CustomizationArchived { customization_id: String },

    /// Input exceeds a configured size cap
    #[error("{what} too large: {size} exceeds limit {limit}")]
    InputTooLarge {
        what: String,
        size: usize,
        limit: usize,
    },

    // ===== Generic Errors =====
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from RevlexError to ExError
impl From<RevlexError> for ExError {
    fn from(err: RevlexError) -> Self {
        let message = err.to_string();
        match err {
            RevlexError::MalformedPatch { op_index, .. } => {
                ExError::new(ExErrorKind::MalformedPatch)
                    .with_op_index(op_index)
                    .with_message(message)
            }
            RevlexError::PatchApplication {
                failed_op_index, ..
            } => ExError::new(ExErrorKind::PatchApplication)
                .with_op_index(failed_op_index)
                .with_message(message),
            RevlexError::DeltaApplication { .. } => {
                ExError::new(ExErrorKind::DeltaApplication).with_message(message)
            }
            RevlexError::InvalidUnifiedDiff { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            RevlexError::IntegrityMismatch { .. } => {
                ExError::new(ExErrorKind::IntegrityMismatch).with_message(message)
            }
            RevlexError::ConcurrentModification {
                customization_id,
                sequence,
            } => ExError::new(ExErrorKind::Concurrency)
                .with_customization_id(customization_id)
                .with_sequence(sequence)
                .with_message(message),
            RevlexError::CustomizationNotFound { customization_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_customization_id(customization_id)
                    .with_message(message)
            }
            RevlexError::SnapshotNotFound { snapshot_id } => {
                ExError::new(ExErrorKind::SnapshotNotFound)
                    .with_snapshot_id(snapshot_id)
                    .with_message(message)
            }
            RevlexError::RollbackTargetNotFound {
                customization_id,
                sequence,
            } => ExError::new(ExErrorKind::RollbackTargetNotFound)
                .with_customization_id(customization_id)
                .with_sequence(sequence)
                .with_message(message),
            RevlexError::SnapshotFinalized { snapshot_id }
            | RevlexError::SnapshotNotFinalized { snapshot_id } => {
                ExError::new(ExErrorKind::IllegalState)
                    .with_snapshot_id(snapshot_id)
                    .with_message(message)
            }
            RevlexError::CustomizationArchived { customization_id } => {
                ExError::new(ExErrorKind::IllegalState)
                    .with_customization_id(customization_id)
                    .with_message(message)
            }
            RevlexError::InputTooLarge { .. } => {
                ExError::new(ExErrorKind::InputTooLarge).with_message(message)
            }
            RevlexError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            RevlexError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}
