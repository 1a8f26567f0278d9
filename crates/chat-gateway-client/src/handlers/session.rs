//! Session control handlers (op 7, op 9)

use super::{Flow, InboundContext};
use crate::connection::Disconnect;
use crate::protocol::GatewayMessage;

/// Handles server-initiated session changes
pub struct SessionHandler;

impl SessionHandler {
    /// Reconnect: drop the connection and resume
    pub fn reconnect(ctx: &InboundContext) -> Flow {
        tracing::info!(shard = %ctx.shard, "Server requested reconnect");
        Flow::Disconnect(Disconnect::ReconnectRequested)
    }

    /// Invalid Session: resume or start over depending on `d`
    pub fn invalid_session(ctx: &InboundContext, message: &GatewayMessage) -> Flow {
        let resumable = message.as_invalid_session().unwrap_or(false);
        tracing::warn!(shard = %ctx.shard, resumable, "Session invalidated by server");
        Flow::Disconnect(Disconnect::InvalidSession { resumable })
    }
}
