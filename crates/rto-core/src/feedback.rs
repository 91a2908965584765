//! Feedback records handed to the learner by the event scheduler.

use serde::{Deserialize, Serialize};

/// Packet identifier, unique while the packet is pending.
pub type PacketId = u64;

/// Ground-truth outcome for one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// RTO chosen when the packet was sent.
    pub rto: usize,
    /// Round-trip time actually observed.
    pub rtt: usize,
    /// Tick at which this record becomes deliverable.
    pub arrival: u64,
    pub packet_id: PacketId,
}

impl Feedback {
    pub fn new(rto: usize, rtt: usize, arrival: u64, packet_id: PacketId) -> Self {
        Self {
            rto,
            rtt,
            arrival,
            packet_id,
        }
    }

    /// Absolute distance between the chosen timeout and the real RTT.
    pub fn regret(&self) -> usize {
        self.rto.abs_diff(self.rtt)
    }
}
