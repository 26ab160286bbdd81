//! # Outbound Queue
//!
//! Ordered buffer for frames produced while the push channel is not open.
//! FIFO ordering is a hard invariant: frames are handed to the transport in
//! the exact order they were enqueued, with no reordering across a
//! reconnect boundary. Growth is bounded; past capacity the oldest frame is
//! evicted and counted, so prolonged disconnection cannot exhaust memory.

use std::collections::VecDeque;
use std::time::Instant;

use crate::protocol::envelope::Envelope;

/// A frame awaiting transmission.
#[derive(Debug)]
pub struct QueuedMessage {
    /// The buffered envelope.
    pub envelope: Envelope,
    /// When the frame entered the queue.
    pub enqueued_at: Instant,
}

/// Bounded FIFO of frames to replay once the channel reopens.
#[derive(Debug)]
pub struct OutboundQueue {
    frames: VecDeque<QueuedMessage>,
    capacity: usize,
    dropped: u64,
}

impl OutboundQueue {
    /// Creates an empty queue holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Appends a frame, evicting the oldest one when the queue is full.
    pub fn push(&mut self, envelope: Envelope) {
        if self.frames.len() == self.capacity {
            if let Some(evicted) = self.frames.pop_front() {
                self.dropped += 1;
                log::warn!(
                    "Outbound queue full ({} frames); dropping oldest '{}' frame queued {:?} ago",
                    self.capacity,
                    evicted.envelope.kind,
                    evicted.enqueued_at.elapsed()
                );
            }
        }
        self.frames.push_back(QueuedMessage {
            envelope,
            enqueued_at: Instant::now(),
        });
    }

    /// The oldest queued frame, without removing it.
    pub fn front(&self) -> Option<&Envelope> {
        self.frames.front().map(|m| &m.envelope)
    }

    /// Removes and returns the oldest queued frame.
    pub fn pop(&mut self) -> Option<Envelope> {
        self.frames.pop_front().map(|m| m.envelope)
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the queue holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total frames evicted by the capacity policy so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(seq: u64) -> Envelope {
        Envelope::custom("cart_sync", json!({ "seq": seq }))
    }

    #[test]
    fn pops_in_enqueue_order() {
        let mut queue = OutboundQueue::new(16);
        queue.push(frame(1));
        queue.push(frame(2));
        queue.push(frame(3));

        let order: Vec<u64> = std::iter::from_fn(|| queue.pop())
            .map(|e| e.data.unwrap()["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(queue.is_empty());
        assert_eq!(queue.dropped(), 0);
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut queue = OutboundQueue::new(2);
        queue.push(frame(1));
        queue.push(frame(2));
        queue.push(frame(3));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 1);
        let order: Vec<u64> = std::iter::from_fn(|| queue.pop())
            .map(|e| e.data.unwrap()["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(order, vec![2, 3]);
    }

    #[test]
    fn zero_capacity_still_holds_one_frame() {
        let mut queue = OutboundQueue::new(0);
        queue.push(frame(1));
        assert_eq!(queue.len(), 1);
    }
}
