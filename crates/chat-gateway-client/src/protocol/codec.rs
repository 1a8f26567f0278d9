//! Envelope codec
//!
//! Turns raw transport frames into [`GatewayMessage`]s and back. Decoding
//! never fails with a panic or an early return: every frame ends up as one of
//! the [`DecodeOutcome`] variants and the caller decides what to do.

use super::{GatewayMessage, OpCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Envelope codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Not valid JSON, or not an envelope
    #[error("Invalid envelope JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A Dispatch envelope without its event name or sequence
    #[error("Dispatch envelope is missing `{0}`")]
    MissingDispatchField(&'static str),

    /// A control envelope carrying dispatch-only fields
    #[error("{op} envelope carries dispatch-only field `{field}`")]
    UnexpectedDispatchField { op: OpCode, field: &'static str },
}

/// Result of decoding one transport frame
#[derive(Debug)]
pub enum DecodeOutcome {
    /// A well-formed envelope with a known op code
    Decoded(GatewayMessage),
    /// A well-formed envelope whose op code this client does not know
    Unknown(u8),
    /// Anything else
    Malformed(CodecError),
}

/// Wire shape with the op code kept raw so unknown codes survive parsing
#[derive(Deserialize)]
struct RawEnvelope {
    op: u8,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    d: Option<Value>,
}

/// Encode an envelope as a JSON text frame
pub fn encode_envelope(message: &GatewayMessage) -> Result<String, CodecError> {
    Ok(message.to_json()?)
}

/// Decode one frame into an envelope
#[must_use]
pub fn decode_envelope(bytes: &[u8]) -> DecodeOutcome {
    let raw: RawEnvelope = match serde_json::from_slice(bytes) {
        Ok(raw) => raw,
        Err(e) => return DecodeOutcome::Malformed(e.into()),
    };

    let Some(op) = OpCode::from_u8(raw.op) else {
        return DecodeOutcome::Unknown(raw.op);
    };

    if op == OpCode::Dispatch {
        if raw.t.is_none() {
            return DecodeOutcome::Malformed(CodecError::MissingDispatchField("t"));
        }
        if raw.s.is_none() {
            return DecodeOutcome::Malformed(CodecError::MissingDispatchField("s"));
        }
    } else if raw.t.is_some() {
        return DecodeOutcome::Malformed(CodecError::UnexpectedDispatchField { op, field: "t" });
    } else if raw.s.is_some() {
        return DecodeOutcome::Malformed(CodecError::UnexpectedDispatchField { op, field: "s" });
    }

    DecodeOutcome::Decoded(GatewayMessage {
        op,
        t: raw.t,
        s: raw.s,
        d: raw.d,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Command, PresenceUpdatePayload, ResumePayload, Status};
    use serde_json::json;

    fn round_trip(message: &GatewayMessage) -> GatewayMessage {
        let encoded = encode_envelope(message).unwrap();
        match decode_envelope(encoded.as_bytes()) {
            DecodeOutcome::Decoded(decoded) => decoded,
            other => panic!("expected a decoded envelope, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_preserves_op_and_payload() {
        let messages = [
            GatewayMessage::heartbeat(Some(12)),
            GatewayMessage::resume(&ResumePayload {
                token: "t".to_string(),
                session_id: "s".to_string(),
                seq: 3,
            })
            .unwrap(),
            Command::PresenceUpdate(PresenceUpdatePayload::new(Status::Idle))
                .to_message()
                .unwrap(),
            GatewayMessage::dispatch("MESSAGE_CREATE", 9, json!({"id": "1"})),
            GatewayMessage::hello(45_000),
            GatewayMessage::invalid_session(true),
            GatewayMessage::heartbeat_ack(),
        ];

        for message in &messages {
            assert_eq!(&round_trip(message), message);
        }
    }

    #[test]
    fn test_server_nulls_are_accepted() {
        let frame = br#"{"op":11,"t":null,"s":null,"d":null}"#;
        match decode_envelope(frame) {
            DecodeOutcome::Decoded(msg) => {
                assert_eq!(msg.op, OpCode::HeartbeatAck);
                assert!(msg.d.is_none());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_op_code() {
        assert!(matches!(
            decode_envelope(br#"{"op":5,"d":null}"#),
            DecodeOutcome::Unknown(5)
        ));
        assert!(matches!(
            decode_envelope(br#"{"op":42}"#),
            DecodeOutcome::Unknown(42)
        ));
    }

    #[test]
    fn test_malformed_frames() {
        assert!(matches!(
            decode_envelope(b"not json"),
            DecodeOutcome::Malformed(CodecError::Json(_))
        ));
        assert!(matches!(
            decode_envelope(br#"{"t":"READY"}"#),
            DecodeOutcome::Malformed(CodecError::Json(_))
        ));
        assert!(matches!(
            decode_envelope(br#"{"op":0,"s":1,"d":{}}"#),
            DecodeOutcome::Malformed(CodecError::MissingDispatchField("t"))
        ));
        assert!(matches!(
            decode_envelope(br#"{"op":0,"t":"READY","d":{}}"#),
            DecodeOutcome::Malformed(CodecError::MissingDispatchField("s"))
        ));
        assert!(matches!(
            decode_envelope(br#"{"op":11,"s":4}"#),
            DecodeOutcome::Malformed(CodecError::UnexpectedDispatchField { field: "s", .. })
        ));
    }
}
