use crate::model::RecordKind;
use schemasnap_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias using SnapError
pub type Result<T> = std::result::Result<T, SnapError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// test assertions and responses built by an outer transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Snapshot pipeline
    /// One of the concurrent metadata fetches failed
    FetchFailed,
    /// The canonical sorter hit a self-referential or unbounded structure
    CycleDetected,

    // Operation executor
    /// A named permission role does not exist
    RoleResolution,
    /// A serialized payload or query could not be parsed
    InvalidPayloadFormat,
    InvalidInput,
    /// The resolved context may not perform the operation
    Forbidden,

    // Collaborators
    /// Process-wide defaults were requested but never installed
    NotConfigured,
    ExternalService,

    Serialization,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::FetchFailed => "ERR_FETCH_FAILED",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::RoleResolution => "ERR_ROLE_RESOLUTION",
            ExErrorKind::InvalidPayloadFormat => "ERR_INVALID_PAYLOAD_FORMAT",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Forbidden => "ERR_FORBIDDEN",
            ExErrorKind::NotConfigured => "ERR_NOT_CONFIGURED",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carried across crate boundaries and through the collaborator ports.
/// Classification lives in `kind`; the remaining fields are context for
/// whoever reads the error.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    collection: Option<String>,
    record_kind: Option<RecordKind>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            collection: None,
            record_kind: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_record_kind(mut self, kind: RecordKind) -> Self {
        self.record_kind = Some(kind);
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Wrap the error that caused this one
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

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn record_kind(&self) -> Option<RecordKind> {
        self.record_kind
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

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
        if let Some(kind) = self.record_kind {
            write!(f, " (record_kind: {})", kind)?;
        }
        if let Some(collection) = &self.collection {
            write!(f, " (collection: {})", collection)?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
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

/// Typed errors raised by the pure functions of this crate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapError {
    /// Fetching one record kind from the schema service failed
    #[error("Failed to fetch {kind}: {reason}")]
    Fetch { kind: RecordKind, reason: String },

    /// Nesting exceeded the canonical depth bound
    #[error("Cyclic or unbounded structure at {path} (depth {depth})")]
    CyclicStructure { path: String, depth: usize },

    /// A named role could not be resolved to an accountability context
    #[error("Role not found: {role_id}")]
    RoleNotFound { role_id: String },

    /// A string-form payload or query is not valid JSON
    #[error("Invalid {option} format: {reason}")]
    InvalidPayloadFormat { option: String, reason: String },

    /// A declarative permission value is neither a sentinel nor a role id
    #[error("Invalid permission mode '{value}': {reason}")]
    InvalidPermissionMode { value: String, reason: String },

    /// Process-wide defaults were requested before being installed
    #[error("Process defaults not installed: {what}")]
    DefaultsNotInstalled { what: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<SnapError> for ExError {
    fn from(err: SnapError) -> Self {
        let message = err.to_string();
        match err {
            SnapError::Fetch { kind, .. } => ExError::new(ExErrorKind::FetchFailed)
                .with_record_kind(kind)
                .with_message(message),
            SnapError::CyclicStructure { .. } => {
                ExError::new(ExErrorKind::CycleDetected).with_message(message)
            }
            SnapError::RoleNotFound { .. } => {
                ExError::new(ExErrorKind::RoleResolution).with_message(message)
            }
            SnapError::InvalidPayloadFormat { .. } => {
                ExError::new(ExErrorKind::InvalidPayloadFormat).with_message(message)
            }
            SnapError::InvalidPermissionMode { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
            SnapError::DefaultsNotInstalled { .. } => {
                ExError::new(ExErrorKind::NotConfigured).with_message(message)
            }
            SnapError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for SnapError {
    fn from(err: serde_json::Error) -> Self {
        SnapError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        SnapError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let kinds = [
            ExErrorKind::FetchFailed,
            ExErrorKind::CycleDetected,
            ExErrorKind::RoleResolution,
            ExErrorKind::InvalidPayloadFormat,
            ExErrorKind::InvalidInput,
            ExErrorKind::Forbidden,
            ExErrorKind::NotConfigured,
            ExErrorKind::ExternalService,
            ExErrorKind::Serialization,
            ExErrorKind::Internal,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_display_includes_source_chain() {
        let inner = ExError::new(ExErrorKind::ExternalService).with_message("connection reset");
        let outer = ExError::new(ExErrorKind::FetchFailed)
            .with_op("get_snapshot")
            .with_record_kind(RecordKind::Field)
            .with_source(inner);

        let text = outer.to_string();
        assert!(text.starts_with("[ERR_FETCH_FAILED] in operation 'get_snapshot'"));
        assert!(text.contains("record_kind: fields"));
        assert!(text.contains("connection reset"));
        assert!(std::error::Error::source(&outer).is_some());
    }
}
