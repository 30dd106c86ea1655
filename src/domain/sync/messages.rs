//! Wire message types exchanged with the client.
//!
//! Defines one round trip of the protocol:
//! - Client → Server: an [`InboundRequest`] carrying a batch of [`ClientEvent`]s
//! - Server → Client: a [`ResponsePayload`] carrying ordered [`OutboundMessage`]s

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::domain::foundation::{AdapterId, ErrorCode};

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// A new adapter with its full property snapshot.
    AdapterCreated(AdapterCreatedMessage),

    /// One property of an existing adapter changed.
    PropertyChanged(PropertyChangedMessage),

    /// The adapter is gone; the client drops its counterpart.
    AdapterDisposed(AdapterDisposedMessage),

    /// Custom event raised by a model or the session.
    Event(EventMessage),

    /// A client event failed.
    Error(ErrorMessage),
}

impl OutboundMessage {
    /// Adapter the message is about.
    pub fn adapter_id(&self) -> AdapterId {
        match self {
            OutboundMessage::AdapterCreated(m) => m.id,
            OutboundMessage::PropertyChanged(m) => m.id,
            OutboundMessage::AdapterDisposed(m) => m.id,
            OutboundMessage::Event(m) => m.id,
            OutboundMessage::Error(m) => m.id,
        }
    }

    pub fn adapter_created(
        id: AdapterId,
        object_type: impl Into<String>,
        parent_id: AdapterId,
        properties: Map<String, JsonValue>,
    ) -> Self {
        OutboundMessage::AdapterCreated(AdapterCreatedMessage {
            id,
            object_type: object_type.into(),
            parent_id,
            properties,
        })
    }

    pub fn property_changed(id: AdapterId, name: impl Into<String>, value: JsonValue) -> Self {
        OutboundMessage::PropertyChanged(PropertyChangedMessage {
            id,
            name: name.into(),
            value,
        })
    }

    pub fn adapter_disposed(id: AdapterId) -> Self {
        OutboundMessage::AdapterDisposed(AdapterDisposedMessage { id })
    }

    pub fn event(id: AdapterId, name: impl Into<String>, payload: JsonValue) -> Self {
        OutboundMessage::Event(EventMessage {
            id,
            name: name.into(),
            payload,
        })
    }

    pub fn error(
        id: AdapterId,
        event: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        OutboundMessage::Error(ErrorMessage {
            id,
            event: event.into(),
            code,
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterCreatedMessage {
    pub id: AdapterId,
    pub object_type: String,
    /// Creating owner; the reserved session id for the root.
    pub parent_id: AdapterId,
    pub properties: Map<String, JsonValue>,
}

/// `value` is a primitive, `{"ref": id}`, an array of refs, or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChangedMessage {
    pub id: AdapterId,
    pub name: String,
    pub value: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterDisposedMessage {
    pub id: AdapterId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    pub id: AdapterId,
    pub name: String,
    pub payload: JsonValue,
}

/// Per-event failure, scoped to the adapter the event targeted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub id: AdapterId,
    pub event: String,
    pub code: ErrorCode,
    pub message: String,
}

/// One response: the outbound batch of a single round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub sequence_no: u64,
    pub messages: Vec<OutboundMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub session_terminated: bool,
}

impl ResponsePayload {
    pub fn new(sequence_no: u64, messages: Vec<OutboundMessage>) -> Self {
        Self {
            sequence_no,
            messages,
            error: None,
            session_terminated: false,
        }
    }

    /// A response rejecting the whole request; the session stays usable.
    pub fn rejected(sequence_no: u64, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: Some(ResponseError {
                code,
                message: message.into(),
            }),
            ..Self::new(sequence_no, Vec::new())
        }
    }

    /// A response telling the client its session is gone.
    ///
    /// Carries only the code; internal details stay in the server log.
    pub fn terminated(sequence_no: u64, code: ErrorCode) -> Self {
        Self {
            session_terminated: true,
            ..Self::rejected(sequence_no, code, "Session terminated")
        }
    }
}

/// Request-level failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: ErrorCode,
    pub message: String,
}

// ============================================
// Client → Server Messages
// ============================================

/// A single client-originated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEvent {
    pub adapter_id: AdapterId,
    pub name: String,
    #[serde(default)]
    pub payload: JsonValue,
}

impl ClientEvent {
    pub fn new(adapter_id: AdapterId, name: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            adapter_id,
            name: name.into(),
            payload,
        }
    }
}

/// One request: the inbound batch of a single round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    /// Client's own request number, for safe retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_no: Option<u64>,
    /// Highest response sequence number the client has received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_sequence_no: Option<u64>,
    #[serde(default)]
    pub events: Vec<ClientEvent>,
}

impl InboundRequest {
    pub fn new(events: Vec<ClientEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn with_sequence_no(mut self, sequence_no: u64) -> Self {
        self.sequence_no = Some(sequence_no);
        self
    }

    pub fn with_ack(mut self, ack_sequence_no: u64) -> Self {
        self.ack_sequence_no = Some(ack_sequence_no);
        self
    }
}
