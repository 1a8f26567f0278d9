//! Transport boundary
//!
//! The engine talks to the network only through these traits, so the
//! websocket implementation can be swapped (or scripted in tests) without
//! touching protocol or session logic. `open` hands back the two halves of
//! the connection separately: the receive loop owns the stream and the send
//! loop owns the sink.

use async_trait::async_trait;
use thiserror::Error;

pub mod tungstenite;

pub use self::tungstenite::TungsteniteTransport;

/// Boxed write half of an open connection
pub type BoxedSink = Box<dyn TransportSink>;

/// Boxed read half of an open connection
pub type BoxedStream = Box<dyn TransportStream>;

/// One inbound item from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A complete data frame
    Message(Vec<u8>),
    /// The connection closed; `code` is `None` when no close frame arrived
    Closed { code: Option<u16>, reason: String },
}

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Connection already closed")]
    Closed,

    #[error("Transport error: {0}")]
    Other(String),
}

/// Opens message-framed duplex connections
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self, url: &str) -> Result<(BoxedSink, BoxedStream), TransportError>;
}

/// Write half of a connection
#[async_trait]
pub trait TransportSink: Send {
    /// Send one text frame
    async fn send(&mut self, payload: String) -> Result<(), TransportError>;

    /// Send a close frame and shut the write half down
    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError>;
}

/// Read half of a connection
#[async_trait]
pub trait TransportStream: Send {
    /// Receive the next frame
    ///
    /// Must be cancel safe: dropping the future before it resolves loses no
    /// frame.
    async fn recv(&mut self) -> Result<TransportEvent, TransportError>;
}
