//! Receive loop
//!
//! Reads one frame at a time, decodes the envelope and hands it to the
//! handlers. Undecodable frames and protocol violations are skipped; an
//! optional threshold of consecutive failures turns them into a reconnect.

use super::Disconnect;
use crate::handlers::{Flow, HandlerError, InboundContext, MessageDispatcher};
use crate::protocol::{decode_envelope, DecodeOutcome};
use crate::transport::{BoxedStream, TransportEvent};

pub struct ReceiveLoop {
    pub stream: BoxedStream,
    pub ctx: InboundContext,
    /// `None` skips bad messages forever
    pub max_consecutive_failures: Option<u32>,
}

impl ReceiveLoop {
    pub async fn run(mut self) -> Disconnect {
        let mut failures: u32 = 0;

        loop {
            let next = tokio::select! {
                biased;
                () = self.ctx.cancel.cancelled() => return Disconnect::Cancelled,
                next = self.stream.recv() => next,
            };

            let bytes = match next {
                Ok(TransportEvent::Message(bytes)) => bytes,
                Ok(TransportEvent::Closed { code, reason }) => {
                    tracing::info!(shard = %self.ctx.shard, code = ?code, reason = %reason, "Gateway closed the connection");
                    return Disconnect::Closed { code, reason };
                }
                Err(e) => {
                    tracing::warn!(shard = %self.ctx.shard, error = %e, "Transport read failed");
                    return Disconnect::Transport(e);
                }
            };

            let result = match decode_envelope(&bytes) {
                DecodeOutcome::Decoded(message) => MessageDispatcher::dispatch(&self.ctx, message).await,
                DecodeOutcome::Unknown(op) => Err(HandlerError::UnknownOpcode(op)),
                DecodeOutcome::Malformed(e) => Err(e.into()),
            };

            match result {
                Ok(Flow::Continue) => failures = 0,
                Ok(Flow::Disconnect(reason)) => return reason,
                Err(e) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(
                        shard = %self.ctx.shard,
                        error = %e,
                        consecutive = failures,
                        "Skipping inbound message"
                    );
                    if let Some(max) = self.max_consecutive_failures {
                        if failures >= max {
                            return Disconnect::DecodeFailures(failures);
                        }
                    }
                }
            }
        }
    }
}
