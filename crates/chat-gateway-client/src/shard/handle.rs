//! Application-facing handles
//!
//! [`GatewayHandle`] submits commands and observes the connection;
//! [`EventStream`] pulls dispatch events in the order they arrived.

use crate::connection::{ConnectionState, HeartbeatMonitor, SessionState, SharedSession};
use crate::events::DispatchEvent;
use crate::protocol::Command;
use chat_model::ShardId;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Why a command was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The command queue is at capacity
    #[error("Command queue is full")]
    QueueFull,

    /// The gateway has shut down
    #[error("Gateway is not running")]
    NotConnected,
}

/// Cloneable handle to a running [`Gateway`](super::Gateway)
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    pub(super) commands: mpsc::Sender<Command>,
    pub(super) state: watch::Receiver<ConnectionState>,
    pub(super) session: SharedSession,
    pub(super) heartbeat: Arc<HeartbeatMonitor>,
    pub(super) shard: ShardId,
}

impl GatewayHandle {
    /// Queue a command without waiting
    ///
    /// Commands queued while disconnected are sent after the next successful
    /// handshake.
    pub fn try_submit(&self, command: impl Into<Command>) -> Result<(), SubmitError> {
        self.commands.try_send(command.into()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SubmitError::NotConnected,
        })
    }

    /// Queue a command, waiting for queue capacity
    pub async fn submit(&self, command: impl Into<Command>) -> Result<(), SubmitError> {
        self.commands
            .send(command.into())
            .await
            .map_err(|_| SubmitError::NotConnected)
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribe to state transitions
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until the connection reaches `target`
    ///
    /// Returns `false` if the gateway stopped first.
    pub async fn wait_for_state(&self, target: ConnectionState) -> bool {
        let mut state = self.state.clone();
        let reached = state
            .wait_for(|current| *current == target || current.is_terminated())
            .await
            .map(|current| *current);

        match reached {
            Ok(current) => current == target,
            Err(_) => *state.borrow() == target,
        }
    }

    /// Snapshot of the session
    pub fn session(&self) -> SessionState {
        self.session.lock().clone()
    }

    /// Round trip of the most recently acknowledged heartbeat
    pub fn latency(&self) -> Option<Duration> {
        self.heartbeat.latency()
    }

    pub fn shard(&self) -> ShardId {
        self.shard
    }
}

/// Ordered stream of dispatch events
///
/// Yields `None` once the gateway has stopped and every queued event has been
/// taken.
#[derive(Debug)]
pub struct EventStream {
    pub(super) rx: mpsc::Receiver<DispatchEvent>,
}

impl EventStream {
    /// Wait for the next event
    pub async fn next_event(&mut self) -> Option<DispatchEvent> {
        self.rx.recv().await
    }

    /// Take an event if one is already queued
    pub fn try_next_event(&mut self) -> Option<DispatchEvent> {
        self.rx.try_recv().ok()
    }
}
