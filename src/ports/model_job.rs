//! ModelJob port - Blocking work run outside the session lock.
//!
//! A job never touches the session directly. Its outcome re-enters the
//! session as a synthetic client event, processed like any other batch.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::domain::foundation::FacadeError;

/// Port for background work whose result is delivered to an adapter.
///
/// # Example
///
/// ```ignore
/// struct LoadRows { query: String }
///
/// #[async_trait]
/// impl ModelJob for LoadRows {
///     fn name(&self) -> &str { "loadRows" }
///     async fn run(&self) -> Result<JsonValue, FacadeError> {
///         Ok(json!({"rows": fetch(&self.query).await?}))
///     }
/// }
/// ```
#[async_trait]
pub trait ModelJob: Send + Sync {
    /// Event name the outcome is delivered under.
    fn name(&self) -> &str;

    /// Performs the work. May block on I/O; never holds the session lock.
    async fn run(&self) -> Result<JsonValue, FacadeError>;
}
