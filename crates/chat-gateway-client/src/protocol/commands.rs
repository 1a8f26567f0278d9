//! Application commands
//!
//! The outbound operations application code may submit. Identify, Resume and
//! Heartbeat are owned by the engine and cannot be submitted.

use super::{
    CodecError, GatewayMessage, OpCode, PresenceUpdatePayload, RequestGuildMembersPayload,
    VoiceStateUpdatePayload,
};

/// A command queued for transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Update the client's presence (op 3)
    PresenceUpdate(PresenceUpdatePayload),
    /// Join, move or leave a voice channel (op 4)
    VoiceStateUpdate(VoiceStateUpdatePayload),
    /// Request guild member chunks (op 8)
    RequestGuildMembers(RequestGuildMembersPayload),
}

impl Command {
    /// Op code this command is sent with
    #[must_use]
    pub const fn op(&self) -> OpCode {
        match self {
            Self::PresenceUpdate(_) => OpCode::PresenceUpdate,
            Self::VoiceStateUpdate(_) => OpCode::VoiceStateUpdate,
            Self::RequestGuildMembers(_) => OpCode::RequestGuildMembers,
        }
    }

    /// Wrap the command in its envelope
    pub fn to_message(&self) -> Result<GatewayMessage, CodecError> {
        match self {
            Self::PresenceUpdate(payload) => GatewayMessage::with_payload(self.op(), payload),
            Self::VoiceStateUpdate(payload) => GatewayMessage::with_payload(self.op(), payload),
            Self::RequestGuildMembers(payload) => GatewayMessage::with_payload(self.op(), payload),
        }
    }
}

impl From<PresenceUpdatePayload> for Command {
    fn from(payload: PresenceUpdatePayload) -> Self {
        Self::PresenceUpdate(payload)
    }
}

impl From<VoiceStateUpdatePayload> for Command {
    fn from(payload: VoiceStateUpdatePayload) -> Self {
        Self::VoiceStateUpdate(payload)
    }
}

impl From<RequestGuildMembersPayload> for Command {
    fn from(payload: RequestGuildMembersPayload) -> Self {
        Self::RequestGuildMembers(payload)
    }
}
