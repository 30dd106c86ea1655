//! Application layer - Concurrent access to sessions.
//!
//! The domain [`Session`](crate::domain::sync::Session) is single-threaded.
//! This layer serializes access to it, runs background jobs outside the
//! session lock, and keeps the set of live sessions.

mod session_handle;
mod session_lock;
mod session_store;

pub use session_handle::SessionHandle;
pub use session_lock::{SessionGuard, SessionLock};
pub use session_store::SessionStore;
