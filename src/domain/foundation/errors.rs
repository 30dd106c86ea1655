//! Error types for the synchronization layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

use super::{AdapterId, ModelHandle, SessionId};

/// Client-visible error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Lookup errors
    AdapterNotFound,
    ModelNotFound,
    ModelTypeMismatch,
    UnsupportedModelKind,

    // Event errors
    UnknownEvent,
    UnknownProperty,
    InvalidPayload,
    FacadeFailed,
    BatchTooLarge,

    // Session errors
    ProtocolViolation,
    InvalidStateTransition,
    SessionDisposed,
    SessionTerminated,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::AdapterNotFound => "ADAPTER_NOT_FOUND",
            ErrorCode::ModelNotFound => "MODEL_NOT_FOUND",
            ErrorCode::ModelTypeMismatch => "MODEL_TYPE_MISMATCH",
            ErrorCode::UnsupportedModelKind => "UNSUPPORTED_MODEL_KIND",
            ErrorCode::UnknownEvent => "UNKNOWN_EVENT",
            ErrorCode::UnknownProperty => "UNKNOWN_PROPERTY",
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
            ErrorCode::FacadeFailed => "FACADE_FAILED",
            ErrorCode::BatchTooLarge => "BATCH_TOO_LARGE",
            ErrorCode::ProtocolViolation => "PROTOCOL_VIOLATION",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::SessionDisposed => "SESSION_DISPOSED",
            ErrorCode::SessionTerminated => "SESSION_TERMINATED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// How far a facade failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    /// Only the triggering event failed; the batch continues.
    #[default]
    Recoverable,
    /// The model is left in a state that requires tearing the session down.
    Fatal,
}

/// Failure raised by a domain facade action.
#[derive(Debug, Clone)]
pub struct FacadeError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
    pub severity: Severity,
}

impl FacadeError {
    /// Creates a recoverable facade error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::FacadeFailed,
            message: message.into(),
            details: HashMap::new(),
            severity: Severity::Recoverable,
        }
    }

    /// Creates a facade error the domain marks as non-recoverable.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            ..Self::new(message)
        }
    }

    /// Creates an error for a payload the facade could not interpret.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidPayload,
            ..Self::new(message)
        }
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for FacadeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for FacadeError {}

/// Errors raised by the synchronization layer.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("Adapter {0} not found")]
    AdapterNotFound(AdapterId),

    #[error("No adapter registered for model {0}")]
    ModelNotAdapted(ModelHandle),

    #[error("Model {0} not found")]
    ModelNotFound(ModelHandle),

    #[error("Model {handle} is not a {expected}")]
    ModelTypeMismatch {
        handle: ModelHandle,
        expected: &'static str,
    },

    #[error("No adapter spec registered for '{0}'")]
    UnsupportedModelKind(String),

    #[error("Adapter type '{object_type}' has no event '{event}'")]
    UnknownEvent { object_type: String, event: String },

    #[error("Adapter type '{object_type}' has no writable property '{property}'")]
    UnknownProperty {
        object_type: String,
        property: String,
    },

    #[error("Invalid payload for '{event}': {reason}")]
    InvalidPayload { event: String, reason: String },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Session {0} is disposed")]
    SessionDisposed(SessionId),

    #[error(transparent)]
    Facade(#[from] FacadeError),
}

impl SyncError {
    /// Creates a protocol violation error.
    pub fn protocol(message: impl Into<String>) -> Self {
        SyncError::ProtocolViolation(message.into())
    }

    /// Returns the client-visible code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SyncError::AdapterNotFound(_) => ErrorCode::AdapterNotFound,
            SyncError::ModelNotAdapted(_) => ErrorCode::AdapterNotFound,
            SyncError::ModelNotFound(_) => ErrorCode::ModelNotFound,
            SyncError::ModelTypeMismatch { .. } => ErrorCode::ModelTypeMismatch,
            SyncError::UnsupportedModelKind(_) => ErrorCode::UnsupportedModelKind,
            SyncError::UnknownEvent { .. } => ErrorCode::UnknownEvent,
            SyncError::UnknownProperty { .. } => ErrorCode::UnknownProperty,
            SyncError::InvalidPayload { .. } => ErrorCode::InvalidPayload,
            SyncError::ProtocolViolation(_) => ErrorCode::ProtocolViolation,
            SyncError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            SyncError::SessionDisposed(_) => ErrorCode::SessionDisposed,
            SyncError::Facade(e) => e.code,
        }
    }

    /// Returns true if this error must terminate the session.
    ///
    /// Per-event failures (unknown names, bad payloads, recoverable facade
    /// failures, type mismatches on the facade path) are isolated to the event
    /// that raised them. Everything indicating a broken invariant is fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::UnknownEvent { .. }
            | SyncError::UnknownProperty { .. }
            | SyncError::InvalidPayload { .. }
            | SyncError::ModelTypeMismatch { .. }
            | SyncError::AdapterNotFound(_)
            | SyncError::ModelNotAdapted(_) => false,
            SyncError::Facade(e) => e.is_fatal(),
            SyncError::ModelNotFound(_)
            | SyncError::UnsupportedModelKind(_)
            | SyncError::ProtocolViolation(_)
            | SyncError::InvalidTransition { .. }
            | SyncError::SessionDisposed(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_display_formats_correctly() {
        assert_eq!(format!("{}", ErrorCode::AdapterNotFound), "ADAPTER_NOT_FOUND");
        assert_eq!(format!("{}", ErrorCode::BatchTooLarge), "BATCH_TOO_LARGE");
    }

    #[test]
    fn error_code_serializes_like_display() {
        let json = serde_json::to_string(&ErrorCode::SessionTerminated).unwrap();
        assert_eq!(json, "\"SESSION_TERMINATED\"");
    }

    #[test]
    fn facade_error_displays_code_and_message() {
        let err = FacadeError::new("row does not exist");
        assert_eq!(format!("{}", err), "[FACADE_FAILED] row does not exist");
    }

    #[test]
    fn facade_error_with_detail_adds_detail() {
        let err = FacadeError::new("boom").with_detail("row", "7");
        assert_eq!(err.details.get("row"), Some(&"7".to_string()));
    }

    #[test]
    fn facade_error_severity_drives_fatality() {
        assert!(!SyncError::from(FacadeError::new("x")).is_fatal());
        assert!(SyncError::from(FacadeError::fatal("x")).is_fatal());
    }

    #[test]
    fn invalid_payload_keeps_its_code() {
        let err = SyncError::from(FacadeError::invalid_payload("not a number"));
        assert_eq!(err.code(), ErrorCode::InvalidPayload);
    }

    #[test]
    fn stale_and_unknown_names_are_recoverable() {
        assert!(!SyncError::AdapterNotFound(AdapterId::from_raw(9)).is_fatal());
        assert!(!SyncError::UnknownEvent {
            object_type: "Button".into(),
            event: "explode".into()
        }
        .is_fatal());
    }

    #[test]
    fn invariant_violations_are_fatal() {
        assert!(SyncError::protocol("append outside open buffer").is_fatal());
        assert!(SyncError::UnsupportedModelKind("Calendar".into()).is_fatal());
        assert_eq!(
            SyncError::protocol("x").code(),
            ErrorCode::ProtocolViolation
        );
    }
}
