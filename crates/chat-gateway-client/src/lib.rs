//! # chat-gateway-client
//!
//! Client side of the real-time gateway: keeps one shard connected across
//! drops, resumes sessions, heartbeats, and hands typed dispatch events to
//! the application in arrival order.
//!
//! ```no_run
//! use chat_common::GatewayConfig;
//! use chat_gateway_client::{Gateway, TungsteniteTransport};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env()?;
//! let (gateway, _handle, mut events) = Gateway::new(config, TungsteniteTransport::new());
//! let cancel = CancellationToken::new();
//! tokio::spawn(gateway.run(cancel.clone()));
//!
//! while let Some(event) = events.next_event().await {
//!     println!("{} #{}", event.name(), event.sequence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod events;
pub mod handlers;
pub mod protocol;
pub mod shard;
pub mod transport;

pub use connection::ConnectionState;
pub use error::GatewayError;
pub use events::{DispatchEvent, GatewayEvent, GatewayEventType};
pub use protocol::{Command, GatewayMessage, OpCode};
pub use shard::{EventStream, Gateway, GatewayHandle, SubmitError};
pub use transport::{Transport, TungsteniteTransport};
