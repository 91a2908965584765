//! Delayed feedback delivery.
//!
//! Feedback records wait in a min-heap keyed by `(arrival, packet_id)`.
//! `drain_ready(t)` pops every record with `arrival <= t`, each exactly once,
//! in arrival order with ties broken by packet id.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rto_core::{Feedback, PacketId};

#[derive(Debug, Clone, Copy)]
struct Queued(Feedback);

impl Queued {
    fn key(&self) -> (u64, PacketId) {
        (self.0.arrival, self.0.packet_id)
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Queued {}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of in-flight feedback.
#[derive(Debug, Clone, Default)]
pub struct FeedbackQueue {
    heap: BinaryHeap<Reverse<Queued>>,
    delivered_count: u64,
}

impl FeedbackQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feedback: Feedback) {
        self.heap.push(Reverse(Queued(feedback)));
    }

    /// Pop every record with `arrival <= now`.
    pub fn drain_ready(&mut self, now: u64) -> Vec<Feedback> {
        let mut ready = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.0.arrival > now {
                break;
            }
            if let Some(Reverse(Queued(feedback))) = self.heap.pop() {
                ready.push(feedback);
            }
        }
        self.delivered_count += ready.len() as u64;
        ready
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered_count
    }
}
