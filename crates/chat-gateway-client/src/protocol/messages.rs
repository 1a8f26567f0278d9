//! Gateway message format
//!
//! Defines the envelope shared by every WebSocket message.

use super::{CloseCode, CodecError, HelloPayload, IdentifyPayload, OpCode, ResumePayload};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Gateway message format
///
/// All messages sent over the WebSocket connection follow this format.
/// `t` and `s` are only present on Dispatch envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event name (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    /// Create a control envelope carrying `d`
    #[must_use]
    pub fn new(op: OpCode, d: Option<Value>) -> Self {
        Self { op, t: None, s: None, d }
    }

    /// Create a control envelope with a serialized payload
    pub fn with_payload<T: Serialize>(op: OpCode, payload: &T) -> Result<Self, CodecError> {
        Ok(Self::new(op, Some(serde_json::to_value(payload)?)))
    }

    // === Client Messages ===

    /// Create a Heartbeat message (op=1)
    ///
    /// `d` is the last sequence received, or `null` before any dispatch.
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::new(
            OpCode::Heartbeat,
            Some(last_sequence.map_or(Value::Null, Value::from)),
        )
    }

    /// Create an Identify message (op=2)
    pub fn identify(payload: &IdentifyPayload) -> Result<Self, CodecError> {
        Self::with_payload(OpCode::Identify, payload)
    }

    /// Create a Resume message (op=6)
    pub fn resume(payload: &ResumePayload) -> Result<Self, CodecError> {
        Self::with_payload(OpCode::Resume, payload)
    }

    // === Server Messages ===

    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_name: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_name.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self::new(
            OpCode::Hello,
            Some(json!({ "heartbeat_interval": heartbeat_interval })),
        )
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::new(OpCode::HeartbeatAck, None)
    }

    /// Create a Reconnect message (op=7)
    #[must_use]
    pub fn reconnect() -> Self {
        Self::new(OpCode::Reconnect, None)
    }

    /// Create an Invalid Session message (op=9)
    ///
    /// `resumable` indicates if the session can be resumed.
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::new(OpCode::InvalidSession, Some(Value::Bool(resumable)))
    }

    // === Parsing ===

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.d.as_ref().and_then(|d| HelloPayload::deserialize(d).ok())
    }

    /// Try to parse as an Identify payload (op=2)
    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        if self.op != OpCode::Identify {
            return None;
        }
        self.d.as_ref().and_then(|d| IdentifyPayload::deserialize(d).ok())
    }

    /// Try to parse as a Resume payload (op=6)
    pub fn as_resume(&self) -> Option<ResumePayload> {
        if self.op != OpCode::Resume {
            return None;
        }
        self.d.as_ref().and_then(|d| ResumePayload::deserialize(d).ok())
    }

    /// Try to parse the heartbeat sequence number (op=1)
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }

    /// Try to parse the resumable flag of an Invalid Session (op=9)
    ///
    /// A missing or non-boolean `d` reads as not resumable.
    pub fn as_invalid_session(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Build a `(code, reason)` close frame
    #[must_use]
    pub fn close_frame(code: CloseCode) -> (u16, String) {
        (code.as_u16(), code.description().to_string())
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::IdentifyProperties;
    use chat_model::{Intents, ShardId};

    #[test]
    fn test_heartbeat_carries_sequence_or_null() {
        let msg = GatewayMessage::heartbeat(Some(41));
        assert_eq!(msg.to_json().unwrap(), r#"{"op":1,"d":41}"#);
        assert_eq!(msg.as_heartbeat_seq(), Some(Some(41)));

        let first = GatewayMessage::heartbeat(None);
        assert_eq!(first.to_json().unwrap(), r#"{"op":1,"d":null}"#);
        assert_eq!(first.as_heartbeat_seq(), Some(None));
    }

    #[test]
    fn test_identify_message() {
        let payload = IdentifyPayload {
            token: "abc".to_string(),
            properties: IdentifyProperties::new("linux", "lib", "lib"),
            intents: Intents::GUILDS,
            shard: ShardId::ONE,
            large_threshold: 50,
            presence: None,
        };
        let msg = GatewayMessage::identify(&payload).unwrap();
        assert_eq!(msg.op, OpCode::Identify);

        let parsed = msg.as_identify().unwrap();
        assert_eq!(parsed.token, "abc");
        assert_eq!(parsed.shard, ShardId::ONE);
        assert!(msg.as_resume().is_none());
    }

    #[test]
    fn test_resume_message() {
        let payload = ResumePayload {
            token: "abc".to_string(),
            session_id: "s-1".to_string(),
            seq: 7,
        };
        let msg = GatewayMessage::resume(&payload).unwrap();
        assert_eq!(msg.op, OpCode::Resume);
        assert_eq!(msg.as_resume(), Some(payload));
    }

    #[test]
    fn test_unserializable_payload_is_an_error() {
        let mut payload = std::collections::BTreeMap::new();
        payload.insert((1, 2), "tuple keys are not JSON object keys");
        assert!(matches!(
            GatewayMessage::with_payload(OpCode::PresenceUpdate, &payload),
            Err(CodecError::Json(_))
        ));
    }

    #[test]
    fn test_hello_message() {
        let msg = GatewayMessage::hello(41_250);
        assert_eq!(msg.as_hello(), Some(HelloPayload::with_interval(41_250)));
        assert!(msg.t.is_none());
        assert!(msg.s.is_none());
    }

    #[test]
    fn test_invalid_session_message() {
        assert_eq!(GatewayMessage::invalid_session(true).as_invalid_session(), Some(true));
        assert_eq!(GatewayMessage::invalid_session(false).as_invalid_session(), Some(false));
        assert_eq!(
            GatewayMessage::new(OpCode::InvalidSession, None).as_invalid_session(),
            Some(false)
        );
        assert_eq!(GatewayMessage::reconnect().as_invalid_session(), None);
    }

    #[test]
    fn test_close_frame() {
        let (code, desc) = GatewayMessage::close_frame(CloseCode::AuthenticationFailed);
        assert_eq!(code, 4004);
        assert!(desc.contains("Authentication"));
    }

    #[test]
    fn test_message_display() {
        let dispatch = GatewayMessage::dispatch("MESSAGE_CREATE", 5, serde_json::json!({}));
        let display = format!("{dispatch}");
        assert!(display.contains("MESSAGE_CREATE"));
        assert!(display.contains("s=5"));

        let ack = GatewayMessage::heartbeat_ack();
        assert!(format!("{ack}").contains("HeartbeatAck"));
    }
}
