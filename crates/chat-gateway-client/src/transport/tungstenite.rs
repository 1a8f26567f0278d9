//! tokio-tungstenite transport

use super::{BoxedSink, BoxedStream, Transport, TransportError, TransportEvent, TransportSink, TransportStream};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport over tokio-tungstenite (`ws://` and `wss://`)
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn open(&self, url: &str) -> Result<(BoxedSink, BoxedStream), TransportError> {
        let (ws, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(status = %response.status(), "WebSocket handshake complete");

        let (sink, stream) = ws.split();
        Ok((
            Box::new(TungsteniteSink { inner: sink }),
            Box::new(TungsteniteStream { inner: stream }),
        ))
    }
}

struct TungsteniteSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl TransportSink for TungsteniteSink {
    async fn send(&mut self, payload: String) -> Result<(), TransportError> {
        self.inner.send(Message::Text(payload)).await?;
        Ok(())
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: WsCloseCode::from(code),
            reason: reason.to_owned().into(),
        };
        self.inner.send(Message::Close(Some(frame))).await?;
        self.inner.close().await?;
        Ok(())
    }
}

struct TungsteniteStream {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl TransportStream for TungsteniteStream {
    async fn recv(&mut self) -> Result<TransportEvent, TransportError> {
        loop {
            let Some(message) = self.inner.next().await else {
                return Ok(TransportEvent::Closed {
                    code: None,
                    reason: "stream ended".to_string(),
                });
            };

            match message? {
                Message::Text(text) => return Ok(TransportEvent::Message(text.into_bytes())),
                Message::Binary(bytes) => return Ok(TransportEvent::Message(bytes)),
                Message::Close(frame) => {
                    return Ok(match frame {
                        Some(frame) => TransportEvent::Closed {
                            code: Some(u16::from(frame.code)),
                            reason: frame.reason.into_owned(),
                        },
                        None => TransportEvent::Closed {
                            code: None,
                            reason: String::new(),
                        },
                    });
                }
                // Pongs are queued by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}
