//! Test helpers for integration tests
//!
//! [`mock_transport`] returns a [`MockTransport`] for the engine and a
//! [`MockServer`] for the test. Every `open` on the transport shows up as a
//! [`MockConnection`] the test can script frame by frame.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chat_gateway_client::protocol::{GatewayMessage, OpCode};
use chat_gateway_client::transport::{
    BoxedSink, BoxedStream, Transport, TransportError, TransportEvent, TransportSink, TransportStream,
};
use tokio::sync::mpsc;

/// How long a helper waits before failing the test
///
/// Tests run on a paused clock, so this only elapses when the engine has
/// nothing left to do.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(300);

/// A frame written by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    Close(u16),
}

/// Create a connected transport/server pair
pub fn mock_transport() -> (MockTransport, MockServer) {
    let (connections_tx, connections) = mpsc::unbounded_channel();
    let opened = Arc::new(AtomicUsize::new(0));
    let refuse = Arc::new(AtomicBool::new(false));

    let transport = MockTransport {
        connections: connections_tx,
        opened: opened.clone(),
        refuse: refuse.clone(),
    };
    let server = MockServer {
        connections,
        opened,
        refuse,
    };
    (transport, server)
}

/// Transport handed to the engine
pub struct MockTransport {
    connections: mpsc::UnboundedSender<MockConnection>,
    opened: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, url: &str) -> Result<(BoxedSink, BoxedStream), TransportError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();

        let connection = MockConnection {
            url: url.to_string(),
            to_client,
            from_client,
        };
        self.connections
            .send(connection)
            .map_err(|_| TransportError::Connect("mock server dropped".to_string()))?;

        Ok((
            Box::new(MockSink { to_server }),
            Box::new(MockStream { from_server }),
        ))
    }
}

struct MockSink {
    to_server: mpsc::UnboundedSender<ClientFrame>,
}

#[async_trait]
impl TransportSink for MockSink {
    async fn send(&mut self, payload: String) -> Result<(), TransportError> {
        self.to_server
            .send(ClientFrame::Text(payload))
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self, code: u16, _reason: &str) -> Result<(), TransportError> {
        self.to_server
            .send(ClientFrame::Close(code))
            .map_err(|_| TransportError::Closed)
    }
}

struct MockStream {
    from_server: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl TransportStream for MockStream {
    async fn recv(&mut self) -> Result<TransportEvent, TransportError> {
        Ok(self.from_server.recv().await.unwrap_or(TransportEvent::Closed {
            code: None,
            reason: "connection dropped".to_string(),
        }))
    }
}

/// Server side of the mock transport
pub struct MockServer {
    connections: mpsc::UnboundedReceiver<MockConnection>,
    opened: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
}

impl MockServer {
    /// Wait for the engine to open the next connection
    pub async fn accept(&mut self) -> Result<MockConnection> {
        match tokio::time::timeout(RECV_TIMEOUT, self.connections.recv()).await {
            Ok(Some(connection)) => Ok(connection),
            Ok(None) => bail!("Transport dropped"),
            Err(_) => bail!("No connection attempt within {RECV_TIMEOUT:?}"),
        }
    }

    /// Number of `open` calls so far, refused ones included
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Make every following `open` fail
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

/// One scripted connection; dropping it drops the connection without a close frame
pub struct MockConnection {
    pub url: String,
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<ClientFrame>,
}

impl MockConnection {
    /// Send an envelope to the engine
    pub fn send(&self, message: &GatewayMessage) {
        let json = serde_json::to_string(message).unwrap_or_default();
        self.send_raw(&json);
    }

    /// Send arbitrary bytes to the engine
    pub fn send_raw(&self, text: &str) {
        let _ = self
            .to_client
            .send(TransportEvent::Message(text.as_bytes().to_vec()));
    }

    /// Close the connection with a close frame
    pub fn close(&self, code: u16) {
        let _ = self.to_client.send(TransportEvent::Closed {
            code: Some(code),
            reason: "closed by server".to_string(),
        });
    }

    /// Next frame written by the engine
    pub async fn recv_frame(&mut self) -> Result<ClientFrame> {
        match tokio::time::timeout(RECV_TIMEOUT, self.from_client.recv()).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => bail!("Engine dropped the connection"),
            Err(_) => bail!("No frame within {RECV_TIMEOUT:?}"),
        }
    }

    /// Next envelope written by the engine
    pub async fn recv_message(&mut self) -> Result<GatewayMessage> {
        match self.recv_frame().await? {
            ClientFrame::Text(text) => Ok(serde_json::from_str(&text)?),
            ClientFrame::Close(code) => bail!("Expected a message, got close {code}"),
        }
    }

    /// Next envelope other than a heartbeat; heartbeats are acknowledged
    pub async fn recv_command(&mut self) -> Result<GatewayMessage> {
        loop {
            let message = self.recv_message().await?;
            if message.op == OpCode::Heartbeat {
                self.send(&GatewayMessage::heartbeat_ack());
                continue;
            }
            return Ok(message);
        }
    }

    /// Skip frames until the engine closes; returns the close code
    pub async fn expect_closed(&mut self) -> Result<u16> {
        loop {
            if let ClientFrame::Close(code) = self.recv_frame().await? {
                return Ok(code);
            }
        }
    }
}
