//! Outbound frame buffer.
//!
//! Frames submitted before the socket is open (or after it closed) park
//! here and are drained in submission order on the open transition. An
//! explicit queue keeps the flush atomic: a frame enqueued before another
//! can never execute after it, and there are no retry timers to leak.

use std::collections::VecDeque;

/// FIFO buffer for outbound frames awaiting a ready connection.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    frames: VecDeque<String>,
}

impl OutboundQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a frame at the back of the queue.
    pub fn push(&mut self, frame: String) {
        self.frames.push_back(frame);
    }

    /// Take every parked frame, oldest first, leaving the queue empty.
    pub fn drain(&mut self) -> impl Iterator<Item = String> + '_ {
        self.frames.drain(..)
    }

    /// Number of parked frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order() {
        let mut queue = OutboundQueue::new();
        queue.push("a".into());
        queue.push("b".into());
        queue.push("c".into());
        let drained: Vec<String> = queue.drain().collect();
        assert_eq!(drained, ["a", "b", "c"]);
    }

    #[test]
    fn drain_empties_queue() {
        let mut queue = OutboundQueue::new();
        queue.push("a".into());
        let _ = queue.drain().count();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn push_after_drain() {
        let mut queue = OutboundQueue::new();
        queue.push("a".into());
        let _ = queue.drain().count();
        queue.push("b".into());
        assert_eq!(queue.drain().collect::<Vec<_>>(), ["b"]);
    }

    #[test]
    fn new_queue_is_empty() {
        assert!(OutboundQueue::new().is_empty());
    }
}
