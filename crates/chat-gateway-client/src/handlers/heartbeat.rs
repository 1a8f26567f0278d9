//! Heartbeat handlers (op 1, op 11)

use super::{Flow, InboundContext};

/// Handles heartbeat traffic from the server
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Heartbeat ACK: clear the liveness flag
    pub fn ack(ctx: &InboundContext) -> Flow {
        match ctx.heartbeat.acknowledge() {
            Some(latency) => tracing::trace!(
                shard = %ctx.shard,
                latency_ms = latency.as_millis() as u64,
                "Heartbeat acknowledged"
            ),
            None => tracing::trace!(shard = %ctx.shard, "Unsolicited heartbeat ACK"),
        }
        Flow::Continue
    }

    /// Server asked for a heartbeat right now
    pub fn request(ctx: &InboundContext) -> Flow {
        tracing::debug!(shard = %ctx.shard, "Server requested a heartbeat");
        ctx.heartbeat.request();
        Flow::Continue
    }
}
