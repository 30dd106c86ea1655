//! Ports - Interfaces for external collaborators.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the synchronization domain and the outside world. Adapters implement
//! these ports.
//!
//! - `SessionListener` - Observes adapter and session lifecycle
//! - `ModelJob` - Background work whose outcome re-enters a session

mod model_job;
mod session_listener;

pub use model_job::ModelJob;
pub use session_listener::SessionListener;
