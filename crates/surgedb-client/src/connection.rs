//! Connection manager: one transport, its lifecycle state, and the
//! outbound queue.
//!
//! The manager runs as a single tokio task that owns the transport
//! channels. All sends funnel through one unbounded command channel, so
//! delivery order matches submission order whether a frame goes straight
//! to the socket or parks in the [`OutboundQueue`] first. Inbound frames
//! are decoded here and handed to the router one response at a time, in
//! arrival order.
//!
//! State is monotonic per physical connection: `Connecting -> Open ->
//! Closed`, with no reconnect. After `Closed`, new sends keep buffering
//! (nothing is ever discarded) but are never flushed; callers observe the
//! terminal state through the watch channel and decide for themselves.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use surgedb_core::{Response, codec};

use crate::errors::ClientError;
use crate::queue::OutboundQueue;
use crate::transport::{Transport, TransportChannels, TransportEvent};

/// Lifecycle state of the one underlying connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport is being established; sends are buffered.
    Connecting,
    /// Transport is ready; sends go straight through.
    Open,
    /// Transport closed. Terminal: buffered sends are never flushed.
    Closed,
}

/// Destination for decoded inbound responses.
pub(crate) trait Router: Send + Sync + 'static {
    /// Deliver one response, in arrival order.
    fn route(&self, response: Response);
}

/// Cheap handle onto the connection task.
#[derive(Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<String>,
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionHandle {
    /// Enqueue a frame for delivery. Never blocks; order across calls is
    /// preserved regardless of connection readiness.
    pub fn send(&self, frame: String) -> Result<(), ClientError> {
        self.commands
            .send(frame)
            .map_err(|_| ClientError::ConnectionClosed)
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch channel for observing state transitions.
    #[must_use]
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

/// Spawn the connection task for a transport and return its handle.
pub(crate) fn spawn(transport: Box<dyn Transport>, router: Arc<dyn Router>) -> ConnectionHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
    let _task = tokio::spawn(run(transport, command_rx, state_tx, router));
    ConnectionHandle {
        commands: command_tx,
        state: state_rx,
    }
}

async fn run(
    transport: Box<dyn Transport>,
    mut commands: mpsc::UnboundedReceiver<String>,
    state: watch::Sender<ConnectionState>,
    router: Arc<dyn Router>,
) {
    let channels = match transport.connect().await {
        Ok(channels) => channels,
        Err(e) => {
            warn!(error = %e, "transport connect failed");
            let _ = state.send(ConnectionState::Closed);
            buffer_until_dropped(&mut commands).await;
            return;
        }
    };

    live_loop(channels, &mut commands, &state, router.as_ref()).await;

    let _ = state.send(ConnectionState::Closed);
    buffer_until_dropped(&mut commands).await;
}

/// Main loop while the transport is alive. Returns when the transport
/// closes or every handle is dropped.
async fn live_loop(
    channels: TransportChannels,
    commands: &mut mpsc::UnboundedReceiver<String>,
    state: &watch::Sender<ConnectionState>,
    router: &dyn Router,
) {
    let TransportChannels {
        outbound,
        mut events,
    } = channels;
    let mut queue = OutboundQueue::new();
    let mut open = false;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(frame) => {
                    if open {
                        let _ = outbound.send(frame);
                    } else {
                        queue.push(frame);
                    }
                }
                // Every handle dropped: nothing left to do.
                None => return,
            },
            event = events.recv() => match event {
                Some(TransportEvent::Opened) => {
                    if !open {
                        open = true;
                        let flushed = queue.len();
                        for frame in queue.drain() {
                            let _ = outbound.send(frame);
                        }
                        let _ = state.send(ConnectionState::Open);
                        debug!(flushed, "connection open");
                    }
                }
                Some(TransportEvent::Message(raw)) => match codec::decode(&raw) {
                    Ok(responses) => {
                        for response in responses {
                            router.route(response);
                        }
                    }
                    // One malformed frame must not end the receive loop.
                    Err(e) => warn!(error = %e, "discarding malformed frame"),
                },
                Some(TransportEvent::Closed) | None => {
                    debug!(buffered = queue.len(), "connection closed");
                    return;
                }
            }
        }
    }
}

/// Terminal buffering: accept sends forever so nothing is dropped, even
/// though they can no longer be flushed.
async fn buffer_until_dropped(commands: &mut mpsc::UnboundedReceiver<String>) {
    let mut queue = OutboundQueue::new();
    while let Some(frame) = commands.recv().await {
        queue.push(frame);
        debug!(buffered = queue.len(), "buffering frame after close");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use parking_lot::Mutex;

    struct Collecting {
        seen: Mutex<Vec<Response>>,
    }

    impl Collecting {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Router for Collecting {
        fn route(&self, response: Response) {
            self.seen.lock().push(response);
        }
    }

    #[tokio::test]
    async fn starts_connecting() {
        let (transport, _handle) = MemoryTransport::new();
        let conn = spawn(Box::new(transport), Collecting::new());
        assert_eq!(conn.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn buffered_sends_flush_in_order_on_open() {
        let (transport, mut handle) = MemoryTransport::new();
        let conn = spawn(Box::new(transport), Collecting::new());

        conn.send("one".into()).unwrap();
        conn.send("two".into()).unwrap();
        conn.send("three".into()).unwrap();
        handle.open();

        assert_eq!(handle.next_frame().await.as_deref(), Some("one"));
        assert_eq!(handle.next_frame().await.as_deref(), Some("two"));
        assert_eq!(handle.next_frame().await.as_deref(), Some("three"));
    }

    #[tokio::test]
    async fn sends_after_open_keep_order() {
        let (transport, mut handle) = MemoryTransport::new();
        let conn = spawn(Box::new(transport), Collecting::new());

        conn.send("buffered".into()).unwrap();
        handle.open();
        let mut state = conn.state_watch();
        while *state.borrow() != ConnectionState::Open {
            state.changed().await.unwrap();
        }
        conn.send("live".into()).unwrap();

        assert_eq!(handle.next_frame().await.as_deref(), Some("buffered"));
        assert_eq!(handle.next_frame().await.as_deref(), Some("live"));
    }

    #[tokio::test]
    async fn state_transitions_to_open_and_closed() {
        let (transport, handle) = MemoryTransport::new();
        let conn = spawn(Box::new(transport), Collecting::new());
        let mut state = conn.state_watch();

        handle.open();
        while *state.borrow() != ConnectionState::Open {
            state.changed().await.unwrap();
        }

        handle.close();
        while *state.borrow() != ConnectionState::Closed {
            state.changed().await.unwrap();
        }
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn sends_after_close_are_accepted_but_never_flushed() {
        let (transport, mut handle) = MemoryTransport::new();
        let conn = spawn(Box::new(transport), Collecting::new());
        let mut state = conn.state_watch();

        handle.open();
        handle.close();
        while *state.borrow() != ConnectionState::Closed {
            state.changed().await.unwrap();
        }

        conn.send("late".into()).unwrap();
        tokio::task::yield_now().await;
        assert!(handle.try_next_frame().is_none());
    }

    #[tokio::test]
    async fn inbound_frames_route_in_arrival_order() {
        let (transport, handle) = MemoryTransport::new();
        let router = Collecting::new();
        let _conn = spawn(Box::new(transport), router.clone());
        let mut state_probe = _conn.state_watch();

        handle.open();
        handle.message(r#"{"_uid":"a","value":{"x":1}}"#);
        handle.message(r#"{"_uid":"b","value":{"x":2}}"#);
        handle.close();
        while *state_probe.borrow() != ConnectionState::Closed {
            state_probe.changed().await.unwrap();
        }

        let seen = router.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].uid.as_str(), "a");
        assert_eq!(seen[1].uid.as_str(), "b");
    }

    #[tokio::test]
    async fn malformed_frame_does_not_stop_the_loop() {
        let (transport, handle) = MemoryTransport::new();
        let router = Collecting::new();
        let _conn = spawn(Box::new(transport), router.clone());
        let mut state_probe = _conn.state_watch();

        handle.open();
        handle.message("{garbage");
        handle.message(r#"{"_uid":"ok","value":{}}"#);
        handle.close();
        while *state_probe.borrow() != ConnectionState::Closed {
            state_probe.changed().await.unwrap();
        }

        let seen = router.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].uid.as_str(), "ok");
    }

    #[tokio::test]
    async fn batched_frame_routes_each_response() {
        let (transport, handle) = MemoryTransport::new();
        let router = Collecting::new();
        let _conn = spawn(Box::new(transport), router.clone());
        let mut state_probe = _conn.state_watch();

        handle.open();
        handle.message(r#"[{"_uid":"a","value":{"x":1}},{"_uid":"b","value":{"x":2}}]"#);
        handle.close();
        while *state_probe.borrow() != ConnectionState::Closed {
            state_probe.changed().await.unwrap();
        }

        let seen = router.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].uid.as_str(), "a");
        assert_eq!(seen[1].uid.as_str(), "b");
    }
}
