//! Send loop
//!
//! Writes heartbeats and application commands to the transport, one at a
//! time. Heartbeats always go first; commands keep their submission order
//! and are paced by the rate limiter. A command whose write fails is not
//! retried.

use super::Disconnect;
use crate::protocol::{encode_envelope, Command, GatewayMessage};
use crate::transport::BoxedSink;
use chat_model::ShardId;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Command queue receiver, handed from one connection to the next
pub type SharedCommands = Arc<Mutex<mpsc::Receiver<Command>>>;

/// Limiter allowing `per_minute` application commands
#[must_use]
pub fn command_limiter(per_minute: u32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_minute(
        NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN),
    ))
}

pub struct SendLoop {
    pub sink: BoxedSink,
    pub shard: ShardId,
    /// Priority lane fed by the heartbeat timer
    pub heartbeats: mpsc::Receiver<GatewayMessage>,
    pub commands: SharedCommands,
    /// Command taken from the queue but not yet written
    pub pending: Option<Command>,
    pub limiter: DefaultDirectRateLimiter,
    pub cancel: CancellationToken,
}

/// What the send loop hands back to the supervisor
pub struct SendLoopExit {
    pub sink: BoxedSink,
    /// Dequeued command that was never written
    pub unsent: Option<Command>,
    pub reason: Disconnect,
}

impl SendLoop {
    pub async fn run(mut self) -> SendLoopExit {
        let mut commands = self.commands.clone().lock_owned().await;
        let mut commands_open = true;

        let reason = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break Disconnect::Cancelled,
                beat = self.heartbeats.recv() => {
                    let Some(beat) = beat else {
                        // The heartbeat task reports its own reason
                        break Disconnect::Cancelled;
                    };
                    if let Err(reason) = self.write(&beat).await {
                        break reason;
                    }
                }
                () = self.limiter.until_ready(), if self.pending.is_some() => {
                    let Some(command) = self.pending.take() else { continue };
                    let message = match command.to_message() {
                        Ok(message) => message,
                        Err(e) => {
                            tracing::error!(shard = %self.shard, op = %command.op(), error = %e, "Dropping unencodable command");
                            continue;
                        }
                    };
                    tracing::debug!(shard = %self.shard, op = %command.op(), "Sending command");
                    if let Err(reason) = self.write(&message).await {
                        break reason;
                    }
                }
                command = commands.recv(), if commands_open && self.pending.is_none() => {
                    match command {
                        Some(command) => self.pending = Some(command),
                        None => {
                            tracing::debug!(shard = %self.shard, "All gateway handles dropped");
                            commands_open = false;
                        }
                    }
                }
            }
        };

        SendLoopExit {
            sink: self.sink,
            unsent: self.pending,
            reason,
        }
    }

    async fn write(&mut self, message: &GatewayMessage) -> Result<(), Disconnect> {
        let payload = match encode_envelope(message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(shard = %self.shard, op = %message.op, error = %e, "Failed to encode message");
                return Ok(());
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Disconnect::Cancelled),
            sent = self.sink.send(payload) => sent.map_err(|e| {
                tracing::warn!(shard = %self.shard, error = %e, "Transport write failed");
                Disconnect::Transport(e)
            }),
        }
    }
}
