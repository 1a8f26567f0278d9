//! Opening handshake
//!
//! Hello, then Identify or Resume, then READY or RESUMED. No heartbeats are
//! sent until the handshake completes; a server heartbeat request seen here
//! is remembered and served as soon as the heartbeat timer starts.

use crate::connection::{ConnectionState, Disconnect};
use crate::events::GatewayEvent;
use crate::handlers::{DispatchHandler, Flow, HeartbeatHandler, InboundContext, SessionHandler};
use crate::protocol::{
    decode_envelope, encode_envelope, DecodeOutcome, GatewayMessage, IdentifyPayload, OpCode,
    PresenceUpdatePayload, ResumePayload,
};
use crate::transport::{BoxedSink, BoxedStream, TransportEvent};
use chat_common::GatewayConfig;
use std::time::Duration;
use tokio::sync::watch;

pub(crate) struct Handshake<'a> {
    pub config: &'a GatewayConfig,
    pub presence: Option<&'a PresenceUpdatePayload>,
    pub ctx: &'a InboundContext,
    pub state: &'a watch::Sender<ConnectionState>,
}

impl Handshake<'_> {
    /// Run the handshake; returns the heartbeat interval announced by Hello
    pub async fn run(&self, sink: &mut BoxedSink, stream: &mut BoxedStream) -> Result<Duration, Disconnect> {
        self.state.send_replace(ConnectionState::AwaitingHello);
        let hello_timeout = self.config.timeouts.hello;
        let interval = tokio::time::timeout(hello_timeout, self.await_hello(stream))
            .await
            .map_err(|_| Disconnect::HelloTimeout(hello_timeout))??;

        self.state.send_replace(ConnectionState::Authenticating);
        self.authenticate(sink).await?;

        let ready_timeout = self.config.timeouts.ready;
        tokio::time::timeout(ready_timeout, self.await_ready(stream))
            .await
            .map_err(|_| Disconnect::ReadyTimeout(ready_timeout))??;

        Ok(interval)
    }

    async fn await_hello(&self, stream: &mut BoxedStream) -> Result<Duration, Disconnect> {
        let message = match self.next_frame(stream).await? {
            DecodeOutcome::Decoded(message) => message,
            DecodeOutcome::Unknown(op) => {
                return Err(Disconnect::UnexpectedHandshake(format!("unknown op code {op} while waiting for Hello")));
            }
            DecodeOutcome::Malformed(e) => {
                return Err(Disconnect::UnexpectedHandshake(format!("undecodable frame while waiting for Hello: {e}")));
            }
        };

        if message.op != OpCode::Hello {
            return Err(Disconnect::unexpected(message.op, "Hello"));
        }

        match message.as_hello() {
            Some(hello) if hello.heartbeat_interval > 0 => {
                tracing::debug!(
                    shard = %self.ctx.shard,
                    heartbeat_interval = hello.heartbeat_interval,
                    "Received Hello"
                );
                Ok(Duration::from_millis(hello.heartbeat_interval))
            }
            _ => Err(Disconnect::UnexpectedHandshake(
                "Hello without a usable heartbeat interval".to_string(),
            )),
        }
    }

    async fn authenticate(&self, sink: &mut BoxedSink) -> Result<(), Disconnect> {
        let resume = {
            let mut session = self.ctx.session.lock();
            let resume = session.resume_info();
            if resume.is_none() {
                // A new session numbers its dispatches from scratch
                session.discard();
            }
            resume
        };

        let message = match resume {
            Some((session_id, seq)) => {
                tracing::info!(shard = %self.ctx.shard, session_id = %session_id, seq, "Resuming session");
                GatewayMessage::resume(&ResumePayload {
                    token: self.config.token.clone(),
                    session_id,
                    seq,
                })?
            }
            None => {
                tracing::info!(shard = %self.ctx.shard, intents = self.config.intents.bits(), "Identifying");
                GatewayMessage::identify(&IdentifyPayload {
                    token: self.config.token.clone(),
                    properties: (&self.config.properties).into(),
                    intents: self.config.intents,
                    shard: self.config.shard,
                    large_threshold: self.config.large_threshold,
                    presence: self.presence.cloned(),
                })?
            }
        };

        let payload = encode_envelope(&message)?;

        tokio::select! {
            biased;
            () = self.ctx.cancel.cancelled() => Err(Disconnect::Cancelled),
            sent = sink.send(payload) => sent.map_err(Disconnect::from),
        }
    }

    async fn await_ready(&self, stream: &mut BoxedStream) -> Result<(), Disconnect> {
        loop {
            let message = match self.next_frame(stream).await? {
                DecodeOutcome::Decoded(message) => message,
                DecodeOutcome::Unknown(op) => {
                    tracing::warn!(shard = %self.ctx.shard, op, "Skipping unknown op code during handshake");
                    continue;
                }
                DecodeOutcome::Malformed(e) => {
                    tracing::warn!(shard = %self.ctx.shard, error = %e, "Skipping undecodable frame during handshake");
                    continue;
                }
            };

            let flow = match message.op {
                OpCode::Dispatch => {
                    let dispatch = match DispatchHandler::accept(self.ctx, message) {
                        Ok(dispatch) => dispatch,
                        Err(e) => {
                            tracing::warn!(shard = %self.ctx.shard, error = %e, "Skipping dispatch during handshake");
                            continue;
                        }
                    };

                    let completed = match &dispatch.event {
                        GatewayEvent::Ready(ready) => {
                            self.ctx
                                .session
                                .lock()
                                .confirm(ready.session_id.clone(), ready.resume_gateway_url.clone());
                            tracing::info!(
                                shard = %self.ctx.shard,
                                session_id = %ready.session_id,
                                guilds = ready.guilds.len(),
                                "Session established"
                            );
                            true
                        }
                        GatewayEvent::Resumed => {
                            let session_id = self.ctx.session.lock().session_id().map(str::to_owned);
                            tracing::info!(
                                shard = %self.ctx.shard,
                                session_id = ?session_id,
                                seq = dispatch.sequence,
                                "Session resumed"
                            );
                            true
                        }
                        _ => false,
                    };

                    match self.ctx.deliver(dispatch).await {
                        Flow::Continue if completed => return Ok(()),
                        flow => flow,
                    }
                }
                OpCode::InvalidSession => SessionHandler::invalid_session(self.ctx, &message),
                OpCode::Reconnect => SessionHandler::reconnect(self.ctx),
                OpCode::Heartbeat => HeartbeatHandler::request(self.ctx),
                OpCode::HeartbeatAck => HeartbeatHandler::ack(self.ctx),
                op => {
                    tracing::debug!(shard = %self.ctx.shard, op = %op, "Ignoring message during handshake");
                    Flow::Continue
                }
            };

            if let Flow::Disconnect(reason) = flow {
                return Err(reason);
            }
        }
    }

    async fn next_frame(&self, stream: &mut BoxedStream) -> Result<DecodeOutcome, Disconnect> {
        let next = tokio::select! {
            biased;
            () = self.ctx.cancel.cancelled() => return Err(Disconnect::Cancelled),
            next = stream.recv() => next,
        };

        match next? {
            TransportEvent::Message(bytes) => Ok(decode_envelope(&bytes)),
            TransportEvent::Closed { code, reason } => {
                tracing::info!(shard = %self.ctx.shard, code = ?code, reason = %reason, "Gateway closed the connection during handshake");
                Err(Disconnect::Closed { code, reason })
            }
        }
    }
}
