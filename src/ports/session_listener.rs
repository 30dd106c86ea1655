//! SessionListener port - Observes adapter and session lifecycle.
//!
//! Listeners are called synchronously while the session lock is held, so
//! implementations must be cheap and must not call back into the session.

use crate::domain::foundation::{AdapterId, SessionId};

/// Port for observing the lifecycle of a session's adapters.
///
/// Every method has an empty default so implementations only override what
/// they care about.
pub trait SessionListener: Send + Sync {
    /// An adapter was created and registered.
    fn on_adapter_created(
        &self,
        _session_id: SessionId,
        _adapter_id: AdapterId,
        _object_type: &str,
    ) {
    }

    /// An adapter was disposed.
    fn on_adapter_disposed(&self, _session_id: SessionId, _adapter_id: AdapterId) {}

    /// The session was torn down.
    fn on_session_disposed(&self, _session_id: SessionId) {}
}
