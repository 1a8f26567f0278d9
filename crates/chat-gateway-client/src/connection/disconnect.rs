//! Disconnect reasons
//!
//! Every way a connection attempt can end, and how each one is classified
//! to pick the next supervisor step.

use crate::protocol::{CloseClassification, CloseCode, CodecError, OpCode};
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Why a connection attempt ended
#[derive(Debug, Error)]
pub enum Disconnect {
    /// The remote end closed the transport
    #[error("Connection closed (code {code:?}): {reason}")]
    Closed { code: Option<u16>, reason: String },

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Transport did not open within {0:?}")]
    ConnectTimeout(Duration),

    #[error("No Hello within {0:?}")]
    HelloTimeout(Duration),

    #[error("No READY or RESUMED within {0:?}")]
    ReadyTimeout(Duration),

    /// Anything but the expected envelope during the handshake
    #[error("Unexpected message during handshake: {0}")]
    UnexpectedHandshake(String),

    /// Server sent a Reconnect (op 7)
    #[error("Server requested reconnect")]
    ReconnectRequested,

    /// Server sent an Invalid Session (op 9)
    #[error("Session invalidated (resumable: {resumable})")]
    InvalidSession { resumable: bool },

    /// A heartbeat went unacknowledged for a full interval
    #[error("Heartbeat not acknowledged")]
    Zombied,

    /// Too many consecutive undecodable or invalid messages
    #[error("{0} consecutive undecodable messages")]
    DecodeFailures(u32),

    /// A connection task ended abnormally
    #[error("Connection task failed: {0}")]
    TaskFailed(String),

    /// The configured gateway URL cannot be used
    #[error("Invalid gateway URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// An engine-owned envelope could not be encoded
    #[error("Failed to encode handshake message: {0}")]
    Encode(#[from] CodecError),

    /// Cancellation was requested
    #[error("Cancelled")]
    Cancelled,
}

impl Disconnect {
    /// Decide whether the next attempt resumes, starts fresh or never happens
    pub fn classify(&self) -> CloseClassification {
        match self {
            Self::Closed { code: Some(code), .. } => CloseClassification::from_raw(*code),
            Self::InvalidSession { resumable: false } => CloseClassification::Fresh,
            Self::Cancelled | Self::InvalidUrl { .. } | Self::Encode(_) => CloseClassification::Fatal,
            Self::Closed { code: None, .. }
            | Self::Transport(_)
            | Self::ConnectTimeout(_)
            | Self::HelloTimeout(_)
            | Self::ReadyTimeout(_)
            | Self::UnexpectedHandshake(_)
            | Self::ReconnectRequested
            | Self::InvalidSession { resumable: true }
            | Self::Zombied
            | Self::DecodeFailures(_)
            | Self::TaskFailed(_) => CloseClassification::Resume,
        }
    }

    /// The gateway close code that makes this disconnect fatal, if any
    pub fn fatal_close(&self) -> Option<CloseCode> {
        match self {
            Self::Closed { code: Some(code), .. } => {
                CloseCode::from_u16(*code).filter(|c| !c.should_reconnect())
            }
            _ => None,
        }
    }

    /// Close code the client sends when tearing the transport down
    ///
    /// 4000 keeps the session resumable on the remote end; 1000 ends it.
    pub fn client_close_code(&self) -> u16 {
        match self.classify() {
            CloseClassification::Resume => CloseCode::UnknownError.as_u16(),
            CloseClassification::Fresh | CloseClassification::Fatal => 1000,
        }
    }

    pub(crate) fn unexpected(op: OpCode, expected: &str) -> Self {
        Self::UnexpectedHandshake(format!("{op} while waiting for {expected}"))
    }
}
