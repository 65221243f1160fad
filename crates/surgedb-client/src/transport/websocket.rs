//! Production websocket transport over tokio-tungstenite.
//!
//! The socket is split into a dedicated write task (draining the outbound
//! channel) and a read task (forwarding text frames as events), so the
//! engine never touches the socket directly and write order matches the
//! order frames entered the channel.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::errors::ClientError;

use super::{Transport, TransportChannels, TransportError, TransportEvent};

/// WebSocket transport for a surgedb endpoint.
#[derive(Debug)]
pub struct WebSocketTransport {
    url: Url,
}

impl WebSocketTransport {
    /// Validate the configured endpoint and build the transport.
    ///
    /// Fails with [`ClientError::TransportUnavailable`] when the URL does
    /// not parse or is not a `ws`/`wss` endpoint. This is the one-time
    /// construction check: the facade reports it once and never attempts
    /// to open a connection.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let url = Url::parse(&config.database_url).map_err(|e| {
            ClientError::TransportUnavailable {
                reason: format!("invalid database URL {:?}: {e}", config.database_url),
            }
        })?;
        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            other => Err(ClientError::TransportUnavailable {
                reason: format!("unsupported URL scheme {other:?}, expected ws or wss"),
            }),
        }
    }

    /// The endpoint this transport will connect to.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(self: Box<Self>) -> Result<TransportChannels, TransportError> {
        let (socket, _response) =
            connect_async(self.url.as_str())
                .await
                .map_err(|e| TransportError::Connect {
                    reason: e.to_string(),
                })?;
        debug!(url = %self.url, "websocket connected");

        let (mut sink, mut stream) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        // Handshake is complete once connect_async returns.
        let _ = event_tx.send(TransportEvent::Opened);

        // Write task: drains the outbound channel into the socket in order.
        let _write = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    warn!(error = %e, "websocket send failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Read task: forwards text frames, reports the close exactly once.
        let _read = tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        let _ = event_tx.send(TransportEvent::Message(text.to_string()));
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {} // ping/pong/binary: nothing to forward
                    Err(e) => {
                        warn!(error = %e, "websocket read failed");
                        break;
                    }
                }
            }
            let _ = event_tx.send(TransportEvent::Closed);
        });

        Ok(TransportChannels {
            outbound: outbound_tx,
            events: event_rx,
        })
    }
}
