//! Connection management
//!
//! Session bookkeeping, liveness tracking and the per-connection tasks that
//! read from and write to the transport.

mod backoff;
mod disconnect;
mod heartbeat;
mod receiver;
mod sender;
mod session;
mod state;

pub use backoff::Backoff;
pub use disconnect::Disconnect;
pub use heartbeat::{HeartbeatMonitor, HeartbeatTask};
pub use receiver::ReceiveLoop;
pub use sender::{command_limiter, SendLoop, SendLoopExit, SharedCommands};
pub use session::{SequenceUpdate, SessionState, SharedSession};
pub use state::ConnectionState;
