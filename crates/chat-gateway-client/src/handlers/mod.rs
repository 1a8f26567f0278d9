//! Op code handlers
//!
//! Handles incoming gateway messages based on their operation code.

mod dispatch;
mod error;
mod heartbeat;
mod session;

pub use dispatch::DispatchHandler;
pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use session::SessionHandler;

use crate::connection::{Disconnect, HeartbeatMonitor, SharedSession};
use crate::events::DispatchEvent;
use crate::protocol::{GatewayMessage, OpCode};
use chat_model::ShardId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What the receive loop does after a message
#[derive(Debug)]
pub enum Flow {
    Continue,
    Disconnect(Disconnect),
}

/// State the inbound handlers act on
#[derive(Clone)]
pub struct InboundContext {
    pub shard: ShardId,
    pub session: SharedSession,
    pub heartbeat: Arc<HeartbeatMonitor>,
    pub events: mpsc::Sender<DispatchEvent>,
    pub cancel: CancellationToken,
}

impl InboundContext {
    /// Hand an event to the application, waiting for queue space
    ///
    /// A full queue stalls the caller instead of dropping the event.
    pub async fn deliver(&self, event: DispatchEvent) -> Flow {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Flow::Disconnect(Disconnect::Cancelled),
            sent = self.events.send(event) => {
                if let Err(unsent) = sent {
                    tracing::debug!(
                        shard = %self.shard,
                        event = unsent.0.name(),
                        "Event stream dropped, discarding event"
                    );
                }
                Flow::Continue
            }
        }
    }
}

/// Route inbound server messages to their handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle a message on a live connection
    pub async fn dispatch(ctx: &InboundContext, message: GatewayMessage) -> HandlerResult<Flow> {
        if !message.op.is_server_op() {
            tracing::warn!(shard = %ctx.shard, op = %message.op, "Received client-only op code from server");
            return Err(HandlerError::UnexpectedOpcode(message.op));
        }

        match message.op {
            OpCode::Dispatch => DispatchHandler::handle(ctx, message).await,
            OpCode::HeartbeatAck => Ok(HeartbeatHandler::ack(ctx)),
            OpCode::Heartbeat => Ok(HeartbeatHandler::request(ctx)),
            OpCode::Reconnect => Ok(SessionHandler::reconnect(ctx)),
            OpCode::InvalidSession => Ok(SessionHandler::invalid_session(ctx, &message)),
            OpCode::Hello => {
                tracing::debug!(shard = %ctx.shard, "Duplicate Hello on a live connection, ignoring");
                Ok(Flow::Continue)
            }
            // Client-only op codes were rejected above
            _ => Err(HandlerError::UnexpectedOpcode(message.op)),
        }
    }
}
