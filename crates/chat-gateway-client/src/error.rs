//! Terminal gateway errors

use crate::connection::Disconnect;
use crate::protocol::{CloseCode, CodecError};
use thiserror::Error;

/// Why [`Gateway::run`](crate::shard::Gateway::run) stopped for good
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway run was cancelled")]
    Cancelled,

    #[error("Authentication rejected by the gateway")]
    AuthenticationFailed,

    #[error("Gateway closed the connection with non-recoverable code {0}")]
    FatalClose(CloseCode),

    #[error("Gave up after {attempts} failed attempts (last failure: {last_failure})")]
    RetriesExhausted { attempts: u32, last_failure: String },

    #[error("Invalid gateway URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to encode handshake message: {0}")]
    Encode(#[from] CodecError),

    /// A disconnect that allows no further attempt
    #[error("Gateway connection ended: {0}")]
    Terminated(String),
}

impl GatewayError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<CloseCode> for GatewayError {
    fn from(code: CloseCode) -> Self {
        match code {
            CloseCode::AuthenticationFailed => Self::AuthenticationFailed,
            code => Self::FatalClose(code),
        }
    }
}

/// Terminal error for a disconnect classified as fatal
impl From<Disconnect> for GatewayError {
    fn from(disconnect: Disconnect) -> Self {
        match disconnect {
            Disconnect::Cancelled => Self::Cancelled,
            Disconnect::InvalidUrl { url, reason } => Self::InvalidUrl { url, reason },
            Disconnect::Encode(e) => Self::Encode(e),
            other => match other.fatal_close() {
                Some(code) => code.into(),
                None => Self::Terminated(other.to_string()),
            },
        }
    }
}
