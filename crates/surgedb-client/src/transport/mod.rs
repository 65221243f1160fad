//! Transport boundary: the socket capability the engine consumes.
//!
//! A transport is anything that can be connected once and then provides
//! (a) a sender for outbound text frames and (b) a stream of lifecycle and
//! message events. The production implementation is
//! [`WebSocketTransport`]; [`MemoryTransport`] wires the same seam to
//! in-process channels for tests and embedding.

pub mod memory;
pub mod websocket;

pub use memory::{MemoryHandle, MemoryTransport};
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Event emitted by a connected transport, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket finished its handshake and accepts sends.
    Opened,
    /// One inbound text frame.
    Message(String),
    /// The socket closed. Terminal: no further events follow.
    Closed,
}

/// Transport-level failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection attempt failed.
    #[error("connect failed: {reason}")]
    Connect {
        /// Human-readable failure description.
        reason: String,
    },
}

/// Channel pair handed back by a successful [`Transport::connect`].
///
/// Frames pushed into `outbound` are written to the socket in order by a
/// dedicated write task. Events arrive on `events` in the order the socket
/// produced them.
pub struct TransportChannels {
    /// Outbound frame sender.
    pub outbound: mpsc::UnboundedSender<String>,
    /// Inbound event receiver.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// A socket capability the connection engine can drive.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Establish the connection and hand over its channel pair.
    ///
    /// Consumes the transport: the engine holds exactly one physical
    /// connection per transport, and `Closed` is terminal.
    async fn connect(self: Box<Self>) -> Result<TransportChannels, TransportError>;
}
