//! Adapters - Implementations at the edges of the crate.
//!
//! - `json` - Wire codec for requests and responses
//! - `listeners` - In-memory [`SessionListener`](crate::ports::SessionListener)

pub mod json;
pub mod listeners;

pub use json::{
    decode_request, decode_request_str, encode_response, encode_response_bytes, CodecError,
};
pub use listeners::{LifecycleRecord, RecordingSessionListener};
