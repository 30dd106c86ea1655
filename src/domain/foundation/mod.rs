//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, lifecycle enums and error types that form the
//! vocabulary of the synchronization layer.

mod errors;
mod ids;
mod session_status;
mod timestamp;

pub use errors::{ErrorCode, FacadeError, Severity, SyncError};
pub use ids::{AdapterId, IdSequence, ModelHandle, SessionId};
pub use session_status::SessionStatus;
pub use timestamp::Timestamp;
