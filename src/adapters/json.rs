//! JSON wire codec.
//!
//! Decodes inbound request bodies and encodes response payloads. The
//! transport that carries the bytes lives outside this crate.

use thiserror::Error;

use crate::domain::foundation::ErrorCode;
use crate::domain::sync::{InboundRequest, ResponsePayload};

/// Errors raised while converting between bytes and protocol messages.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Malformed request body: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    #[error("Response could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

impl CodecError {
    /// Client-visible code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            CodecError::MalformedRequest(_) => ErrorCode::InvalidPayload,
            CodecError::Encode(_) => ErrorCode::InternalError,
        }
    }
}

/// Parses a request body.
pub fn decode_request(body: &[u8]) -> Result<InboundRequest, CodecError> {
    serde_json::from_slice(body).map_err(CodecError::MalformedRequest)
}

/// Parses a request body already held as text.
pub fn decode_request_str(body: &str) -> Result<InboundRequest, CodecError> {
    serde_json::from_str(body).map_err(CodecError::MalformedRequest)
}

/// Serializes a response payload.
pub fn encode_response(payload: &ResponsePayload) -> Result<String, CodecError> {
    serde_json::to_string(payload).map_err(CodecError::Encode)
}

/// Serializes a response payload to bytes.
pub fn encode_response_bytes(payload: &ResponsePayload) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(payload).map_err(CodecError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::AdapterId;
    use crate::domain::sync::{ClientEvent, OutboundMessage};
    use serde_json::{json, Value as JsonValue};

    #[test]
    fn decodes_full_request() {
        let body = br#"{
            "sequenceNo": 4,
            "ackSequenceNo": 3,
            "events": [
                {"adapterId": 7, "name": "click"},
                {"adapterId": 8, "name": "property", "payload": {"name": "value", "value": "x"}}
            ]
        }"#;

        let request = decode_request(body).unwrap();

        assert_eq!(request.sequence_no, Some(4));
        assert_eq!(request.ack_sequence_no, Some(3));
        assert_eq!(
            request.events,
            vec![
                ClientEvent::new(AdapterId::from_raw(7), "click", JsonValue::Null),
                ClientEvent::new(
                    AdapterId::from_raw(8),
                    "property",
                    json!({"name": "value", "value": "x"})
                ),
            ]
        );
    }

    #[test]
    fn missing_fields_default() {
        let request = decode_request_str("{}").unwrap();
        assert_eq!(request, InboundRequest::default());
    }

    #[test]
    fn malformed_body_is_invalid_payload() {
        let err = decode_request(b"{\"events\": 3}").unwrap_err();
        assert!(matches!(err, CodecError::MalformedRequest(_)));
        assert_eq!(err.code(), ErrorCode::InvalidPayload);
    }

    #[test]
    fn encodes_response_with_camel_case_fields() {
        let payload = ResponsePayload::new(
            2,
            vec![OutboundMessage::adapter_disposed(AdapterId::from_raw(5))],
        );

        let encoded: JsonValue =
            serde_json::from_slice(&encode_response_bytes(&payload).unwrap()).unwrap();

        assert_eq!(
            encoded,
            json!({
                "sequenceNo": 2,
                "messages": [{"type": "adapterDisposed", "id": 5}]
            })
        );
    }

    #[test]
    fn terminated_response_carries_flag_and_code() {
        let payload = ResponsePayload::terminated(9, ErrorCode::SessionTerminated);
        let encoded: JsonValue = serde_json::from_str(&encode_response(&payload).unwrap()).unwrap();

        assert_eq!(encoded["sessionTerminated"], json!(true));
        assert_eq!(encoded["error"]["code"], json!("SESSION_TERMINATED"));
    }
}
