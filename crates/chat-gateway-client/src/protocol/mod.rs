//! Gateway protocol definitions
//!
//! Defines the WebSocket protocol including op codes, message formats, close
//! codes and the envelope codec.

mod close_codes;
mod codec;
mod commands;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::{CloseClassification, CloseCode};
pub use codec::{decode_envelope, encode_envelope, CodecError, DecodeOutcome};
pub use commands::Command;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{
    Activity, ActivityType, HelloPayload, IdentifyPayload, IdentifyProperties,
    PresenceUpdatePayload, RequestGuildMembersPayload, ResumePayload, Status,
    VoiceStateUpdatePayload,
};
