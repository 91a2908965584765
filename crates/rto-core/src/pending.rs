//! Pending-packet tracker.
//!
//! Per packet: `Sent -> {Acked, Expired}`.
//!
//! | Transition | Trigger |
//! |------------|---------|
//! | Sent | `insert` with countdown = chosen RTO |
//! | Acked | matching feedback delivered this tick (checked first) |
//! | Expired | countdown drops below zero on `tick` |
//!
//! Entries are kept ordered by packet id so expiries come out in increasing
//! id order.

use std::collections::BTreeMap;

use crate::feedback::PacketId;

/// Live state of one in-flight packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    /// Ticks left before the timeout is considered expired.
    pub countdown: i64,
    /// RTO chosen at send time.
    pub original_rto: usize,
}

/// In-flight packets awaiting feedback.
#[derive(Debug, Clone, Default)]
pub struct PendingPackets {
    entries: BTreeMap<PacketId, PendingEntry>,
}

impl PendingPackets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sent packet.
    ///
    /// Returns the entry it replaced if the id was already pending.
    pub fn insert(&mut self, packet_id: PacketId, rto: usize) -> Option<PendingEntry> {
        self.entries.insert(
            packet_id,
            PendingEntry {
                countdown: rto as i64,
                original_rto: rto,
            },
        )
    }

    /// Acked transition. Returns false for unknown ids.
    pub fn acknowledge(&mut self, packet_id: PacketId) -> bool {
        self.entries.remove(&packet_id).is_some()
    }

    /// Decrement every countdown and remove the entries that went negative.
    ///
    /// Returns `(packet_id, original_rto)` for each expiry, ordered by id.
    pub fn tick(&mut self) -> Vec<(PacketId, usize)> {
        let mut expired = Vec::new();
        for (&packet_id, entry) in self.entries.iter_mut() {
            entry.countdown -= 1;
            if entry.countdown < 0 {
                expired.push((packet_id, entry.original_rto));
            }
        }
        for (packet_id, _) in &expired {
            self.entries.remove(packet_id);
        }
        expired
    }

    pub fn get(&self, packet_id: PacketId) -> Option<&PendingEntry> {
        self.entries.get(&packet_id)
    }

    pub fn contains(&self, packet_id: PacketId) -> bool {
        self.entries.contains_key(&packet_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
