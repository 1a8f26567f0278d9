//! Dispatch handler (op 0)

use super::{Flow, HandlerError, HandlerResult, InboundContext};
use crate::connection::SequenceUpdate;
use crate::events::{decode_event, DispatchEvent, GatewayEvent};
use crate::protocol::{CodecError, GatewayMessage};
use serde_json::Value;

/// Handles dispatch envelopes
pub struct DispatchHandler;

impl DispatchHandler {
    /// Record the sequence and decode the event
    ///
    /// The sequence is recorded before decoding; an undecodable event still
    /// counts as received.
    pub fn accept(ctx: &InboundContext, message: GatewayMessage) -> HandlerResult<DispatchEvent> {
        let Some(name) = message.t else {
            return Err(CodecError::MissingDispatchField("t").into());
        };
        let Some(sequence) = message.s else {
            return Err(CodecError::MissingDispatchField("s").into());
        };

        let update = ctx.session.lock().record_sequence(sequence);
        if let SequenceUpdate::Stale { current } = update {
            return Err(HandlerError::StaleSequence {
                received: sequence,
                current,
            });
        }

        let event = decode_event(&name, message.d.unwrap_or(Value::Null))
            .map_err(|source| HandlerError::InvalidPayload { event: name, source })?;

        Ok(DispatchEvent::new(ctx.shard, sequence, event))
    }

    /// Handle a dispatch on a live connection
    pub async fn handle(ctx: &InboundContext, message: GatewayMessage) -> HandlerResult<Flow> {
        let dispatch = Self::accept(ctx, message)?;

        if matches!(dispatch.event, GatewayEvent::Ready(_) | GatewayEvent::Resumed) {
            tracing::warn!(
                shard = %ctx.shard,
                seq = dispatch.sequence,
                event = dispatch.name(),
                "Handshake event on a live connection, ignoring"
            );
            return Ok(Flow::Continue);
        }

        tracing::trace!(
            shard = %ctx.shard,
            seq = dispatch.sequence,
            event = dispatch.name(),
            "Dispatch received"
        );

        Ok(ctx.deliver(dispatch).await)
    }
}
