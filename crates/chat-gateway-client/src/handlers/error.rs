//! Handler error types

use crate::protocol::{CodecError, OpCode};
use thiserror::Error;

/// A protocol violation in one inbound message
///
/// The message is skipped; repeated violations escalate to a reconnect.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Frame is not a valid envelope
    #[error("Malformed envelope: {0}")]
    Malformed(#[from] CodecError),

    /// Op code this client does not know
    #[error("Unknown op code: {0}")]
    UnknownOpcode(u8),

    /// Known op code the server must never send
    #[error("Unexpected op code from server: {0}")]
    UnexpectedOpcode(OpCode),

    /// Dispatch sequence at or below the recorded one
    #[error("Stale sequence {received} (current {current})")]
    StaleSequence { received: u64, current: u64 },

    /// Event payload did not match its event type
    #[error("Invalid {event} payload: {source}")]
    InvalidPayload {
        event: String,
        source: serde_json::Error,
    },
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
