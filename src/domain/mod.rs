//! Domain layer containing the synchronization logic and its types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, status enums, errors)
//! - `model` - The observable model object arena and its listeners
//! - `sync` - Adapters, registry, property pipeline, response buffer, session

pub mod foundation;
pub mod model;
pub mod sync;
