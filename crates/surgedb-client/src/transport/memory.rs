//! In-process transport backed by channels.
//!
//! The [`MemoryHandle`] plays the server side: it opens and closes the
//! "socket", injects inbound frames, and observes every frame the engine
//! sent. Used by the test suites and by hosts that embed a server in the
//! same process.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Transport, TransportChannels, TransportError, TransportEvent};

/// Channel-backed transport for tests and in-process embedding.
pub struct MemoryTransport {
    channels: TransportChannels,
}

/// Remote end of a [`MemoryTransport`].
pub struct MemoryHandle {
    events: mpsc::UnboundedSender<TransportEvent>,
    sent: mpsc::UnboundedReceiver<String>,
}

impl MemoryTransport {
    /// Create a transport plus the handle that drives it.
    #[must_use]
    pub fn new() -> (Self, MemoryHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let transport = Self {
            channels: TransportChannels {
                outbound: outbound_tx,
                events: event_rx,
            },
        };
        let handle = MemoryHandle {
            events: event_tx,
            sent: outbound_rx,
        };
        (transport, handle)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(self: Box<Self>) -> Result<TransportChannels, TransportError> {
        Ok(self.channels)
    }
}

impl MemoryHandle {
    /// Signal that the socket is open and ready for sends.
    pub fn open(&self) {
        let _ = self.events.send(TransportEvent::Opened);
    }

    /// Inject one inbound frame.
    pub fn message(&self, frame: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Message(frame.into()));
    }

    /// Signal that the socket closed. Terminal.
    pub fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed);
    }

    /// Await the next frame the engine sent, if any.
    pub async fn next_frame(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// Take the next already-sent frame without waiting.
    pub fn try_next_frame(&mut self) -> Option<String> {
        self.sent.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_yields_wired_channels() {
        let (transport, mut handle) = MemoryTransport::new();
        let mut channels = Box::new(transport).connect().await.unwrap();

        handle.open();
        assert_eq!(channels.events.recv().await, Some(TransportEvent::Opened));

        let _ = channels.outbound.send("frame".into());
        assert_eq!(handle.next_frame().await.as_deref(), Some("frame"));
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (transport, handle) = MemoryTransport::new();
        handle.open();
        handle.message("a");
        handle.message("b");
        handle.close();

        let mut channels = Box::new(transport).connect().await.unwrap();
        assert_eq!(channels.events.recv().await, Some(TransportEvent::Opened));
        assert_eq!(
            channels.events.recv().await,
            Some(TransportEvent::Message("a".into()))
        );
        assert_eq!(
            channels.events.recv().await,
            Some(TransportEvent::Message("b".into()))
        );
        assert_eq!(channels.events.recv().await, Some(TransportEvent::Closed));
    }

    #[tokio::test]
    async fn try_next_frame_empty() {
        let (_transport, mut handle) = MemoryTransport::new();
        assert!(handle.try_next_frame().is_none());
    }
}
