//! Shard supervisor
//!
//! Owns one logical gateway connection across any number of transport
//! attempts: opens the transport, runs the handshake, starts the heartbeat,
//! receive and send tasks for the `Connected` period, then classifies the
//! disconnect to decide between resuming, starting fresh and stopping.

mod handle;
mod handshake;

pub use handle::{EventStream, GatewayHandle, SubmitError};

use self::handshake::Handshake;
use crate::connection::{
    command_limiter, Backoff, ConnectionState, Disconnect, HeartbeatMonitor, HeartbeatTask,
    ReceiveLoop, SendLoop, SendLoopExit, SessionState, SharedCommands, SharedSession,
};
use crate::error::GatewayError;
use crate::events::DispatchEvent;
use crate::handlers::InboundContext;
use crate::protocol::{CloseClassification, Command, PresenceUpdatePayload};
use crate::transport::{BoxedSink, BoxedStream, Transport};
use chat_common::GatewayConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Heartbeats queued ahead of the send loop
const HEARTBEAT_LANE: usize = 4;

/// Upper bound on sending the close frame
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// How one connection task ended
enum TaskExit {
    Heartbeat(Disconnect),
    Receiver(Disconnect),
    Sender(SendLoopExit),
}

/// Gateway connection engine for a single shard
pub struct Gateway<T: Transport> {
    config: GatewayConfig,
    transport: T,
    presence: Option<PresenceUpdatePayload>,
    session: SharedSession,
    heartbeat: Arc<HeartbeatMonitor>,
    commands: SharedCommands,
    /// Dequeued command carried over to the next connection
    unsent: Option<Command>,
    events: mpsc::Sender<DispatchEvent>,
    state: watch::Sender<ConnectionState>,
    backoff: Backoff,
}

impl<T: Transport> Gateway<T> {
    /// Create the engine together with its application handles
    pub fn new(config: GatewayConfig, transport: T) -> (Self, GatewayHandle, EventStream) {
        let shard = config.shard;
        let (commands_tx, commands_rx) = mpsc::channel(config.queues.command_capacity.max(1));
        let (events_tx, events_rx) = mpsc::channel(config.queues.event_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let session = SessionState::shared(shard);
        let heartbeat = Arc::new(HeartbeatMonitor::new());

        let handle = GatewayHandle {
            commands: commands_tx,
            state: state_rx,
            session: session.clone(),
            heartbeat: heartbeat.clone(),
            shard,
        };

        let gateway = Self {
            backoff: Backoff::new(config.backoff),
            config,
            transport,
            presence: None,
            session,
            heartbeat,
            commands: Arc::new(Mutex::new(commands_rx)),
            unsent: None,
            events: events_tx,
            state: state_tx,
        };

        (gateway, handle, EventStream { rx: events_rx })
    }

    /// Presence sent with every Identify
    pub fn with_presence(mut self, presence: PresenceUpdatePayload) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Run until cancelled or a non-recoverable failure
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), GatewayError> {
        let shard = self.config.shard;
        tracing::info!(shard = %shard, url = %self.config.gateway_url, "Starting gateway");

        let result = self.supervise(&cancel).await;
        self.state.send_replace(ConnectionState::Terminated);

        match &result {
            Ok(()) => tracing::info!(shard = %shard, "Gateway stopped"),
            Err(GatewayError::Cancelled) => tracing::info!(shard = %shard, "Gateway cancelled"),
            Err(e) => tracing::error!(shard = %shard, error = %e, "Gateway terminated"),
        }
        result
    }

    async fn supervise(&mut self, cancel: &CancellationToken) -> Result<(), GatewayError> {
        loop {
            let attempt = self.backoff.failures() + 1;
            let disconnect = self.connect_once(cancel, attempt).await;

            match disconnect.classify() {
                CloseClassification::Resume => {
                    tracing::info!(shard = %self.config.shard, reason = %disconnect, "Connection lost, will resume");
                }
                CloseClassification::Fresh => {
                    tracing::info!(shard = %self.config.shard, reason = %disconnect, "Session ended, will identify");
                    self.session.lock().discard();
                }
                CloseClassification::Fatal => return Err(disconnect.into()),
            }

            let delay = self.backoff.next_delay();
            if let Some(max) = self.config.max_attempts {
                if self.backoff.failures() >= max {
                    return Err(GatewayError::RetriesExhausted {
                        attempts: self.backoff.failures(),
                        last_failure: disconnect.to_string(),
                    });
                }
            }

            self.state.send_replace(ConnectionState::Disconnected);
            tracing::warn!(
                shard = %self.config.shard,
                attempt = self.backoff.failures(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting after backoff"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(GatewayError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One transport attempt, from open to close
    async fn connect_once(&mut self, cancel: &CancellationToken, attempt: u32) -> Disconnect {
        let url = match self.endpoint() {
            Ok(url) => url,
            Err(reason) => return reason,
        };
        self.state.send_replace(ConnectionState::Connecting);
        tracing::info!(shard = %self.config.shard, attempt, url = %url, "Connecting to gateway");

        let connect_timeout = self.config.timeouts.connect;
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return Disconnect::Cancelled,
            opened = tokio::time::timeout(connect_timeout, self.transport.open(&url)) => opened,
        };
        let (mut sink, mut stream) = match opened {
            Ok(Ok(halves)) => halves,
            Ok(Err(e)) => {
                tracing::warn!(shard = %self.config.shard, error = %e, "Failed to open transport");
                return Disconnect::Transport(e);
            }
            Err(_) => return Disconnect::ConnectTimeout(connect_timeout),
        };

        let ctx = InboundContext {
            shard: self.config.shard,
            session: self.session.clone(),
            heartbeat: self.heartbeat.clone(),
            events: self.events.clone(),
            cancel: cancel.child_token(),
        };

        let handshake = Handshake {
            config: &self.config,
            presence: self.presence.as_ref(),
            ctx: &ctx,
            state: &self.state,
        };

        let handshake_result = handshake.run(&mut sink, &mut stream).await;
        let (sink, reason) = match handshake_result {
            Ok(interval) => {
                self.backoff.reset();
                self.heartbeat.reset();
                self.state.send_replace(ConnectionState::Connected);
                tracing::info!(
                    shard = %self.config.shard,
                    heartbeat_interval_ms = interval.as_millis() as u64,
                    "Connected"
                );
                self.run_connected(ctx, interval, sink, stream).await
            }
            Err(reason) => (Some(sink), reason),
        };

        let reason = if cancel.is_cancelled() {
            Disconnect::Cancelled
        } else {
            reason
        };

        self.state.send_replace(ConnectionState::Disconnecting);
        if let Some(mut sink) = sink {
            let code = reason.client_close_code();
            match tokio::time::timeout(CLOSE_TIMEOUT, sink.close(code, "closing")).await {
                Ok(Ok(())) => tracing::debug!(shard = %self.config.shard, code, "Transport closed"),
                Ok(Err(e)) => tracing::debug!(shard = %self.config.shard, error = %e, "Close frame not sent"),
                Err(_) => tracing::debug!(shard = %self.config.shard, "Close frame timed out"),
            }
        }

        reason
    }

    /// Run the three connection tasks until the first one ends
    async fn run_connected(
        &mut self,
        ctx: InboundContext,
        interval: Duration,
        sink: BoxedSink,
        stream: BoxedStream,
    ) -> (Option<BoxedSink>, Disconnect) {
        let cancel = ctx.cancel.clone();
        let (beats_tx, beats_rx) = mpsc::channel(HEARTBEAT_LANE);
        let mut tasks = JoinSet::new();

        let heartbeat = HeartbeatTask {
            interval,
            monitor: self.heartbeat.clone(),
            session: self.session.clone(),
            outbound: beats_tx,
            cancel: cancel.clone(),
        };
        tasks.spawn(async move { TaskExit::Heartbeat(heartbeat.run().await) });

        let receiver = ReceiveLoop {
            stream,
            ctx,
            max_consecutive_failures: self.config.max_consecutive_decode_failures,
        };
        tasks.spawn(async move { TaskExit::Receiver(receiver.run().await) });

        let sender = SendLoop {
            sink,
            shard: self.config.shard,
            heartbeats: beats_rx,
            commands: self.commands.clone(),
            pending: self.unsent.take(),
            limiter: command_limiter(self.config.queues.commands_per_minute),
            cancel: cancel.clone(),
        };
        tasks.spawn(async move { TaskExit::Sender(sender.run().await) });

        let mut sink = None;
        let mut reason = None;

        while let Some(joined) = tasks.join_next().await {
            let exit = match joined {
                Ok(TaskExit::Heartbeat(exit) | TaskExit::Receiver(exit)) => exit,
                Ok(TaskExit::Sender(exit)) => {
                    sink = Some(exit.sink);
                    self.unsent = exit.unsent;
                    exit.reason
                }
                Err(e) => {
                    tracing::error!(shard = %self.config.shard, error = %e, "Connection task failed");
                    Disconnect::TaskFailed(e.to_string())
                }
            };

            if reason.is_none() && !matches!(exit, Disconnect::Cancelled) {
                reason = Some(exit);
            }
            cancel.cancel();
        }

        (sink, reason.unwrap_or(Disconnect::Cancelled))
    }

    /// Resume URL for a resumable session, the discovery URL otherwise
    fn endpoint(&self) -> Result<String, Disconnect> {
        let resume_base = {
            let session = self.session.lock();
            session
                .resume_url()
                .filter(|_| session.is_resumable())
                .map(str::to_owned)
        };

        if let Some(base) = resume_base {
            match gateway_url(&base, self.config.api_version) {
                Ok(url) => return Ok(url),
                Err(e) => {
                    tracing::warn!(shard = %self.config.shard, error = %e, "Ignoring unusable resume URL");
                }
            }
        }
        gateway_url(&self.config.gateway_url, self.config.api_version)
    }
}

/// Set the version and encoding query on a gateway URL
///
/// Existing `v` and `encoding` pairs are replaced, other pairs are kept and
/// any fragment is dropped.
pub(crate) fn gateway_url(base: &str, api_version: u8) -> Result<String, Disconnect> {
    let invalid = |reason: String| Disconnect::InvalidUrl {
        url: base.to_string(),
        reason,
    };

    let mut url = Url::parse(base.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "v" && key != "encoding")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("v", &api_version.to_string())
        .append_pair("encoding", "json");

    Ok(url.into())
}
