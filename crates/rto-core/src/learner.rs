//! Windowed Thompson-sampling learner.
//!
//! Orchestrates the arm bank, selector, frame builder, sliding window and
//! pending tracker behind two operations:
//!
//! - `send_packet(id)`: Thompson-select an RTO and start its countdown.
//! - `update(batch)`: consume the feedback delivered this tick.
//!
//! # Update Order
//!
//! ```text
//! update(batch)
//!   1. validate every record            (reject batch, no mutation)
//!   2. ack pending entries in batch     (Acked before Expired)
//!   3. tick remaining countdowns        -> expiry frames, by packet id
//!   4. one normal frame per record      -> in batch order
//!        (retract the packet's windowed expiry frame first, if any)
//! ```
//!
//! Every frame goes through the sliding window into the arm bank.

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use crate::arm_bank::ArmBank;
use crate::config::LearnerConfig;
use crate::error::RtoError;
use crate::feedback::{Feedback, PacketId};
use crate::frame::CreditFrame;
use crate::invariants::{self, InvariantResult};
use crate::pending::PendingPackets;
use crate::random::DeterministicRng;
use crate::selector::thompson_select;
use crate::window::{FrameOrigin, SlidingWindow};

/// What one `update` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Pending packets resolved by feedback in this batch.
    pub acked: Vec<PacketId>,
    /// Packets whose countdown expired this tick, in increasing id order.
    pub expired: Vec<PacketId>,
    /// Late feedback whose earlier expiry frame was retracted.
    pub reconciled: Vec<PacketId>,
    /// Frames pushed through the window (expiry plus normal).
    pub frames_applied: usize,
}

/// Learner with sliding-window credit assignment and early demotion.
#[derive(Debug, Clone)]
pub struct WindowedThompsonPolicy {
    config: LearnerConfig,
    arms: ArmBank,
    window: SlidingWindow,
    pending: PendingPackets,
    rng: DeterministicRng,
}

impl WindowedThompsonPolicy {
    pub const NAME: &'static str = "WindowedThompsonAgent";

    /// Create a learner; fails if the configuration is invalid.
    pub fn new(config: LearnerConfig, rng: DeterministicRng) -> Result<Self, RtoError> {
        config.validate()?;
        Ok(Self {
            arms: ArmBank::new(config.rtt_range, config.arms_initial_weight),
            window: SlidingWindow::new(config.window_size, config.min_reward, config.max_reward),
            pending: PendingPackets::new(),
            rng,
            config,
        })
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    pub fn arms(&self) -> &ArmBank {
        &self.arms
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn pending(&self) -> &PendingPackets {
        &self.pending
    }

    /// Thompson-sample an RTO without recording a pending packet.
    pub fn choose_rto(&mut self) -> usize {
        thompson_select(&self.arms, &mut self.rng)
    }

    /// Choose an RTO for a new packet and start its countdown.
    ///
    /// Packet ids must be unique while pending; a repeated id overwrites the
    /// earlier entry.
    pub fn send_packet(&mut self, packet_id: PacketId) -> usize {
        let rto = self.choose_rto();
        if let Some(previous) = self.pending.insert(packet_id, rto) {
            warn!(
                packet_id,
                previous_rto = previous.original_rto,
                rto,
                "duplicate send for pending packet, overwriting"
            );
        }
        trace!(packet_id, rto, "packet sent");
        rto
    }

    /// Consume one tick's feedback batch.
    pub fn update(&mut self, feedbacks: &[Feedback]) -> Result<UpdateReport, RtoError> {
        for feedback in feedbacks {
            self.check_range("chosen_rto", feedback.rto, feedback.packet_id)?;
            self.check_range("observed_rtt", feedback.rtt, feedback.packet_id)?;
        }

        let mut report = UpdateReport::default();

        for feedback in feedbacks {
            if self.pending.acknowledge(feedback.packet_id) {
                report.acked.push(feedback.packet_id);
            }
        }

        for (packet_id, original_rto) in self.pending.tick() {
            debug!(packet_id, original_rto, "rto expired before feedback, demoting early");
            let frame = CreditFrame::on_expiry(&self.config, original_rto);
            self.window.apply(&mut self.arms, FrameOrigin::Expiry(packet_id), frame);
            report.expired.push(packet_id);
            report.frames_applied += 1;
        }

        let acked: HashSet<PacketId> = report.acked.iter().copied().collect();
        for feedback in feedbacks {
            let packet_id = feedback.packet_id;
            if self.config.reconcile_late_feedback
                && !acked.contains(&packet_id)
                && self.window.retract_expiry(&mut self.arms, packet_id)
            {
                debug!(packet_id, "late feedback, retracted early demotion");
                report.reconciled.push(packet_id);
            }

            let frame = CreditFrame::on_feedback(&self.config, feedback.rto, feedback.rtt);
            self.window.apply(&mut self.arms, FrameOrigin::Feedback(packet_id), frame);
            report.frames_applied += 1;
        }

        Ok(report)
    }

    /// Push an externally built frame through the window.
    ///
    /// Returns the origin of the evicted frame.
    pub fn apply_frame(&mut self, frame: CreditFrame) -> FrameOrigin {
        self.window.apply(&mut self.arms, FrameOrigin::Manual, frame)
    }

    /// Bounds, window length and (while unclipped) window accounting.
    pub fn check_invariants(&self) -> Vec<InvariantResult> {
        invariants::check_all(&self.arms, &self.window, &self.config)
    }

    fn check_range(
        &self,
        field: &'static str,
        value: usize,
        packet_id: PacketId,
    ) -> Result<(), RtoError> {
        if value < self.config.rtt_range {
            Ok(())
        } else {
            Err(RtoError::OutOfRange {
                field,
                value,
                rtt_range: self.config.rtt_range,
                packet_id,
            })
        }
    }

    /// Test hook: start a countdown with a fixed RTO.
    #[cfg(test)]
    pub(crate) fn track(&mut self, packet_id: PacketId, rto: usize) {
        self.pending.insert(packet_id, rto);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::sigmoid;

    fn learner(config: LearnerConfig) -> WindowedThompsonPolicy {
        WindowedThompsonPolicy::new(config, DeterministicRng::new(12345)).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = WindowedThompsonPolicy::new(
            LearnerConfig::default().with_window_size(0),
            DeterministicRng::new(1),
        );
        assert!(matches!(result, Err(RtoError::InvalidConfig(_))));
    }

    #[test]
    fn test_send_packet_records_pending() {
        let mut learner = learner(LearnerConfig::default());
        let rto = learner.send_packet(1);
        assert!(rto < 1000);
        let entry = learner.pending().get(1).unwrap();
        assert_eq!(entry.original_rto, rto);
        assert_eq!(entry.countdown, rto as i64);
    }

    #[test]
    fn test_same_seed_same_choices() {
        let mut a = learner(LearnerConfig::default());
        let mut b = learner(LearnerConfig::default());
        for id in 0..10 {
            let fb = Feedback::new(a.send_packet(id), 300, id, id);
            assert_eq!(fb.rto, b.send_packet(id));
            a.update(&[fb]).unwrap();
            b.update(&[fb]).unwrap();
        }
        assert_eq!(a.arms(), b.arms());
    }

    #[test]
    fn test_scenario_exact_rtt_with_single_slot_window() {
        let config = LearnerConfig::default().with_window_size(1);
        let mut learner = learner(config);
        let initial = learner.arms().clone();
        learner.track(1, 200);

        let report = learner.update(&[Feedback::new(200, 200, 1, 1)]).unwrap();
        assert_eq!(report.acked, vec![1]);
        assert!(report.expired.is_empty());
        assert_eq!(report.frames_applied, 1);

        for i in 195usize..205 {
            let expected = 2.0 + 10.0 / (1 + i.abs_diff(200)) as f64;
            assert!(close(learner.arms().get(i).unwrap().alpha, expected), "alpha at {}", i);
        }
        for i in 205usize..1000 {
            let expected = 2.0 + i.abs_diff(200) as f64 / 1000.0;
            assert!(close(learner.arms().get(i).unwrap().beta, expected), "beta at {}", i);
        }
        assert_eq!(learner.arms().get(194), initial.get(194));

        let evicted = learner.apply_frame(CreditFrame::zero());
        assert_eq!(evicted, FrameOrigin::Feedback(1));
        for (a, b) in learner.arms().iter().zip(initial.iter()) {
            assert!(close(a.alpha, b.alpha) && close(a.beta, b.beta));
        }
    }

    #[test]
    fn test_scenario_unanswered_packet_expires_on_tick_after_rto() {
        let mut learner = learner(LearnerConfig::default());
        learner.track(7, 50);

        for _ in 0..50 {
            let report = learner.update(&[]).unwrap();
            assert!(report.expired.is_empty());
        }
        assert_eq!(learner.pending().get(7).unwrap().countdown, 0);

        let report = learner.update(&[]).unwrap();
        assert_eq!(report.expired, vec![7]);
        assert!(learner.pending().is_empty());

        for i in 0usize..=50 {
            let arm = learner.arms().get(i).unwrap();
            assert!(close(arm.beta, 2.0 + sigmoid(i.abs_diff(50) as f64)), "beta at {}", i);
            assert_eq!(arm.alpha, 2.0);
        }
        assert_eq!(learner.arms().get(51).unwrap().beta, 2.0);
    }

    #[test]
    fn test_scenario_ack_wins_over_expiry_in_same_tick() {
        let mut learner = learner(LearnerConfig::default());
        learner.track(3, 0);

        let report = learner.update(&[Feedback::new(0, 0, 1, 3)]).unwrap();
        assert_eq!(report.acked, vec![3]);
        assert!(report.expired.is_empty());
        assert_eq!(report.frames_applied, 1);
        assert!(!learner.window().contains(FrameOrigin::Expiry(3)));
    }

    #[test]
    fn test_unknown_packet_feedback_still_learns() {
        let mut learner = learner(LearnerConfig::default());
        let report = learner.update(&[Feedback::new(10, 400, 5, 999)]).unwrap();
        assert!(report.acked.is_empty());
        assert_eq!(report.frames_applied, 1);
        assert!(learner.arms().get(400).unwrap().alpha > 2.0);
    }

    #[test]
    fn test_out_of_range_rejects_whole_batch() {
        let mut learner = learner(LearnerConfig::default());
        learner.track(1, 5);
        let before = learner.arms().clone();

        let err = learner
            .update(&[Feedback::new(5, 100, 1, 1), Feedback::new(5, 1000, 1, 2)])
            .unwrap_err();
        assert!(matches!(err, RtoError::OutOfRange { field: "observed_rtt", value: 1000, .. }));
        assert_eq!(learner.arms(), &before);
        assert!(learner.pending().contains(1));
        assert_eq!(learner.pending().get(1).unwrap().countdown, 5);
    }

    #[test]
    fn test_expiry_frames_before_normal_frames() {
        let mut learner = learner(LearnerConfig::default().with_window_size(3));
        learner.track(20, 0);
        learner.track(10, 0);

        let report = learner.update(&[Feedback::new(30, 30, 1, 99)]).unwrap();
        assert_eq!(report.expired, vec![10, 20]);

        let origins: Vec<FrameOrigin> = learner.window().frames().map(|(o, _)| o).collect();
        assert_eq!(
            origins,
            vec![FrameOrigin::Expiry(10), FrameOrigin::Expiry(20), FrameOrigin::Feedback(99)]
        );
    }

    #[test]
    fn test_late_feedback_retracts_expiry_frame() {
        let mut learner = learner(LearnerConfig::default());
        learner.track(4, 0);

        let report = learner.update(&[]).unwrap();
        assert_eq!(report.expired, vec![4]);
        assert!(close(learner.arms().get(0).unwrap().beta, 2.0 + sigmoid(0.0)));

        let report = learner.update(&[Feedback::new(0, 500, 2, 4)]).unwrap();
        assert_eq!(report.reconciled, vec![4]);
        assert!(!learner.window().contains(FrameOrigin::Expiry(4)));
        assert!(learner.window().contains(FrameOrigin::Feedback(4)));
        // Only the normal frame's demotion remains on arm 0.
        assert!(close(learner.arms().get(0).unwrap().beta, 2.0 + 500.0 / 1000.0));
        assert!(learner.arms().get(500).unwrap().alpha > 2.0);
    }

    #[test]
    fn test_late_feedback_without_reconciliation_stacks_frames() {
        let mut learner = learner(LearnerConfig::default().with_reconciliation(false));
        learner.track(4, 0);
        learner.update(&[]).unwrap();

        let report = learner.update(&[Feedback::new(0, 500, 2, 4)]).unwrap();
        assert!(report.reconciled.is_empty());
        assert!(learner.window().contains(FrameOrigin::Expiry(4)));
        assert!(learner.window().contains(FrameOrigin::Feedback(4)));
    }

    #[test]
    fn test_duplicate_send_last_wins() {
        let mut learner = learner(LearnerConfig::default());
        learner.send_packet(1);
        let second = learner.send_packet(1);
        assert_eq!(learner.pending().len(), 1);
        assert_eq!(learner.pending().get(1).unwrap().original_rto, second);
    }

    #[test]
    fn test_invariants_hold_after_updates() {
        let mut learner = learner(LearnerConfig::default().with_window_size(20));
        for id in 0..100u64 {
            let rto = learner.send_packet(id);
            learner
                .update(&[Feedback::new(rto, (id as usize * 37) % 1000, id, id)])
                .unwrap();
            assert!(learner.check_invariants().iter().all(|r| r.holds));
        }
    }
}
