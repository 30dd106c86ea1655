//! Sync module - Model-to-client adapter synchronization.
//!
//! Keeps a tree of server-side model objects mirrored in a remote client:
//!
//! - [`Adapter`] wraps one model object for one session
//! - [`AdapterRegistry`] owns identity and shared ownership
//! - the property pipeline turns model notifications into messages
//! - [`ResponseBuffer`] accumulates one ordered, deduplicated response
//! - the event dispatcher routes client events to model facades
//! - [`Session`] ties it together and bounds every adapter's lifetime

mod adapter;
mod dispatcher;
mod factory;
mod history;
mod lifecycle;
mod messages;
mod pipeline;
mod registry;
mod response;
mod session;
mod spec;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{Adapter, Owner};
pub use dispatcher::PROPERTY_EVENT;
pub use factory::AdapterFactory;
pub use history::ResponseHistory;
pub use messages::{
    AdapterCreatedMessage, AdapterDisposedMessage, ClientEvent, ErrorMessage, EventMessage,
    InboundRequest, OutboundMessage, PropertyChangedMessage, ResponseError, ResponsePayload,
};
pub use registry::AdapterRegistry;
pub use response::ResponseBuffer;
pub use session::{Session, SessionLimits, INITIALIZED_EVENT, UNLOAD_EVENT};
pub use spec::{AdapterSpec, PropertyDef, PropertyValue};
