//! Sliding window of credit frames.
//!
//! Bounds accumulated credit to the last `window_size` events. Applying a
//! frame adds it to the arm bank, stores it at the tail, evicts the frame at
//! the head and subtracts that one back out, then clips the bank once.
//!
//! # Ring Layout
//!
//! ```text
//!   slots: [ f3 | f4 | f0 | f1 | f2 ]      window_size = 5
//!                      ^head (oldest)
//!
//!   apply(f5):  bank += f5
//!               slots[head] = f5, evict f0, head -> f1
//!               bank -= f0
//!               clip(bank)
//! ```
//!
//! The window is pre-filled with zero frames so its length is constant from
//! construction on.
//!
//! # Accounting
//!
//! While no clip has moved a value, `bank - initial == sum(frames in window)`.
//! Once clipping triggers the identity drifts; the drift is kept as is.

use crate::arm_bank::ArmBank;
use crate::feedback::PacketId;
use crate::frame::CreditFrame;

/// Event that produced a windowed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOrigin {
    /// Pre-fill or retracted slot.
    Empty,
    /// Normal frame from delivered feedback.
    Feedback(PacketId),
    /// Early-demotion frame from an expired timeout.
    Expiry(PacketId),
    /// Frame injected directly by the caller.
    Manual,
}

#[derive(Debug, Clone)]
struct Slot {
    origin: FrameOrigin,
    frame: CreditFrame,
}

impl Slot {
    fn empty() -> Self {
        Self {
            origin: FrameOrigin::Empty,
            frame: CreditFrame::zero(),
        }
    }
}

/// Fixed-capacity ring of the most recent credit frames.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    slots: Vec<Slot>,
    /// Index of the oldest slot.
    head: usize,
    min_reward: f64,
    max_reward: f64,
    /// Parameters moved by clipping since construction.
    clipped_count: u64,
    applied_count: u64,
}

impl SlidingWindow {
    #[must_use]
    pub fn new(window_size: usize, min_reward: f64, max_reward: f64) -> Self {
        debug_assert!(window_size > 0, "Window must hold at least one frame");
        debug_assert!(min_reward <= max_reward, "Inverted reward bounds");
        Self {
            slots: (0..window_size).map(|_| Slot::empty()).collect(),
            head: 0,
            min_reward,
            max_reward,
            clipped_count: 0,
            applied_count: 0,
        }
    }

    /// Window length; constant for the lifetime of the window.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of parameter values moved by clipping so far.
    pub fn clipped_count(&self) -> u64 {
        self.clipped_count
    }

    /// Whether clipping has ever triggered (accounting may have drifted).
    pub fn is_saturated(&self) -> bool {
        self.clipped_count > 0
    }

    /// Frames applied so far, retractions excluded.
    pub fn applied_count(&self) -> u64 {
        self.applied_count
    }

    /// Apply a frame: add new, evict and subtract oldest, clip once.
    ///
    /// Returns the origin of the evicted frame.
    pub fn apply(
        &mut self,
        bank: &mut ArmBank,
        origin: FrameOrigin,
        frame: CreditFrame,
    ) -> FrameOrigin {
        bank.add_frame(&frame);

        let evicted = std::mem::replace(&mut self.slots[self.head], Slot { origin, frame });
        self.head = (self.head + 1) % self.slots.len();

        bank.subtract_frame(&evicted.frame);
        self.clip(bank);
        self.applied_count += 1;

        evicted.origin
    }

    /// Retract the early-expiry frame of `packet_id` if it is still windowed.
    ///
    /// The slot becomes a zero frame, so window length is unchanged.
    pub fn retract_expiry(&mut self, bank: &mut ArmBank, packet_id: PacketId) -> bool {
        let target = FrameOrigin::Expiry(packet_id);
        let Some(slot) = self.slots.iter_mut().find(|s| s.origin == target) else {
            return false;
        };

        let retracted = std::mem::replace(slot, Slot::empty());
        bank.subtract_frame(&retracted.frame);
        self.clip(bank);
        true
    }

    /// Whether a frame with this origin is currently windowed.
    pub fn contains(&self, origin: FrameOrigin) -> bool {
        self.slots.iter().any(|s| s.origin == origin)
    }

    fn clip(&mut self, bank: &mut ArmBank) {
        self.clipped_count += bank.clip(self.min_reward, self.max_reward) as u64;
    }

    /// Frames from oldest to newest.
    pub fn frames(&self) -> impl Iterator<Item = (FrameOrigin, &CreditFrame)> + '_ {
        let len = self.slots.len();
        (0..len).map(move |k| {
            let slot = &self.slots[(self.head + k) % len];
            (slot.origin, &slot.frame)
        })
    }

    /// Dense per-arm sums of all windowed frames as `(promote, demote)`.
    pub fn totals(&self, rtt_range: usize) -> (Vec<f64>, Vec<f64>) {
        let mut promote = vec![0.0; rtt_range];
        let mut demote = vec![0.0; rtt_range];
        for (_, frame) in self.frames() {
            for (i, w) in frame.promote().iter() {
                promote[i] += w;
            }
            for (i, w) in frame.demote().iter() {
                demote[i] += w;
            }
        }
        (promote, demote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LearnerConfig;

    fn config() -> LearnerConfig {
        LearnerConfig::default()
    }

    #[test]
    fn test_prefilled_with_zero_frames() {
        let window = SlidingWindow::new(4, 1.0, 1000.0);
        assert_eq!(window.len(), 4);
        assert!(window.frames().all(|(o, f)| o == FrameOrigin::Empty && f.is_zero()));
    }

    #[test]
    fn test_single_slot_eviction_restores_bank() {
        let cfg = config().with_window_size(1);
        let mut bank = ArmBank::new(cfg.rtt_range, cfg.arms_initial_weight);
        let initial = bank.clone();
        let mut window = SlidingWindow::new(1, cfg.min_reward, cfg.max_reward);

        let frame = CreditFrame::on_feedback(&cfg, 200, 200);
        window.apply(&mut bank, FrameOrigin::Feedback(1), frame);

        let arm = bank.get(200).unwrap();
        assert!((arm.alpha - 12.0).abs() < 1e-12);
        assert!((bank.get(198).unwrap().alpha - (2.0 + 10.0 / 3.0)).abs() < 1e-12);
        assert!((bank.get(205).unwrap().beta - 2.005).abs() < 1e-12);
        assert!((bank.get(999).unwrap().beta - 2.799).abs() < 1e-12);
        assert_eq!(bank.get(194).unwrap(), initial.get(194).unwrap());

        let evicted = window.apply(&mut bank, FrameOrigin::Manual, CreditFrame::zero());
        assert_eq!(evicted, FrameOrigin::Feedback(1));
        for (a, b) in bank.iter().zip(initial.iter()) {
            assert!((a.alpha - b.alpha).abs() < 1e-9);
            assert!((a.beta - b.beta).abs() < 1e-9);
        }
        assert!(!window.is_saturated());
    }

    #[test]
    fn test_fifo_eviction_order() {
        let cfg = config();
        let mut bank = ArmBank::new(cfg.rtt_range, cfg.arms_initial_weight);
        let mut window = SlidingWindow::new(3, cfg.min_reward, cfg.max_reward);

        for id in 1..=3 {
            let frame = CreditFrame::on_feedback(&cfg, 100, 100);
            let evicted = window.apply(&mut bank, FrameOrigin::Feedback(id), frame);
            assert_eq!(evicted, FrameOrigin::Empty);
        }
        for id in 4..=6 {
            let evicted = window.apply(&mut bank, FrameOrigin::Feedback(id), CreditFrame::zero());
            assert_eq!(evicted, FrameOrigin::Feedback(id - 3));
        }
        assert_eq!(window.applied_count(), 6);
    }

    #[test]
    fn test_clip_after_subtract() {
        // Tight bounds: promotions saturate at max_reward.
        let cfg = config().with_reward_bounds(1.0, 5.0);
        let mut bank = ArmBank::new(cfg.rtt_range, cfg.arms_initial_weight);
        let mut window = SlidingWindow::new(2, cfg.min_reward, cfg.max_reward);

        window.apply(&mut bank, FrameOrigin::Manual, CreditFrame::on_feedback(&cfg, 100, 100));
        assert_eq!(bank.get(100).unwrap().alpha, 5.0);
        assert!(window.is_saturated());

        // Evicting the clipped frame drives alpha below min, which clips to 1.
        window.apply(&mut bank, FrameOrigin::Manual, CreditFrame::zero());
        window.apply(&mut bank, FrameOrigin::Manual, CreditFrame::zero());
        assert_eq!(bank.get(100).unwrap().alpha, 1.0);
    }

    #[test]
    fn test_retract_expiry() {
        let cfg = config();
        let mut bank = ArmBank::new(cfg.rtt_range, cfg.arms_initial_weight);
        let initial = bank.clone();
        let mut window = SlidingWindow::new(10, cfg.min_reward, cfg.max_reward);

        window.apply(&mut bank, FrameOrigin::Expiry(9), CreditFrame::on_expiry(&cfg, 40));
        assert!(window.contains(FrameOrigin::Expiry(9)));
        assert!(bank.get(0).unwrap().beta > 2.0);

        assert!(window.retract_expiry(&mut bank, 9));
        assert!(!window.contains(FrameOrigin::Expiry(9)));
        assert_eq!(window.len(), 10);
        for (a, b) in bank.iter().zip(initial.iter()) {
            assert!((a.beta - b.beta).abs() < 1e-9);
        }

        assert!(!window.retract_expiry(&mut bank, 9));
    }

    #[test]
    fn test_totals_match_bank_delta() {
        let cfg = config();
        let mut bank = ArmBank::new(cfg.rtt_range, cfg.arms_initial_weight);
        let mut window = SlidingWindow::new(3, cfg.min_reward, cfg.max_reward);

        for (rto, rtt) in [(100, 120), (300, 120), (500, 510), (10, 700)] {
            window.apply(&mut bank, FrameOrigin::Manual, CreditFrame::on_feedback(&cfg, rto, rtt));
        }

        let (promote, demote) = window.totals(cfg.rtt_range);
        for (i, arm) in bank.iter().enumerate() {
            assert!((arm.alpha - 2.0 - promote[i]).abs() < 1e-9);
            assert!((arm.beta - 2.0 - demote[i]).abs() < 1e-9);
        }
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::config::LearnerConfig;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_window_accounting_unclipped(
            events in prop::collection::vec((0usize..200, 0usize..200, any::<bool>()), 1..60),
            window_size in 1usize..20,
        ) {
            let cfg = LearnerConfig::default()
                .with_rtt_range(200)
                .with_window_size(window_size)
                .with_reward_bounds(1.0, 1.0e9);
            let mut bank = ArmBank::new(cfg.rtt_range, cfg.arms_initial_weight);
            let mut window = SlidingWindow::new(window_size, cfg.min_reward, cfg.max_reward);

            for (rto, rtt, expired) in events {
                let frame = if expired {
                    CreditFrame::on_expiry(&cfg, rto)
                } else {
                    CreditFrame::on_feedback(&cfg, rto, rtt)
                };
                window.apply(&mut bank, FrameOrigin::Manual, frame);
                prop_assert_eq!(window.len(), window_size);
            }

            prop_assert!(!window.is_saturated());
            let (promote, demote) = window.totals(cfg.rtt_range);
            for (i, arm) in bank.iter().enumerate() {
                prop_assert!((arm.alpha - cfg.arms_initial_weight - promote[i]).abs() < 1e-6);
                prop_assert!((arm.beta - cfg.arms_initial_weight - demote[i]).abs() < 1e-6);
            }
        }

        #[test]
        fn prop_bank_stays_within_bounds(
            events in prop::collection::vec((0usize..50, 0usize..50, any::<bool>()), 1..200),
            max_reward in 2.0f64..30.0,
        ) {
            let cfg = LearnerConfig::default()
                .with_rtt_range(50)
                .with_reward_bounds(1.0, max_reward);
            let mut bank = ArmBank::new(cfg.rtt_range, cfg.arms_initial_weight);
            let mut window = SlidingWindow::new(7, cfg.min_reward, cfg.max_reward);

            for (rto, rtt, expired) in events {
                let frame = if expired {
                    CreditFrame::on_expiry(&cfg, rto)
                } else {
                    CreditFrame::on_feedback(&cfg, rto, rtt)
                };
                window.apply(&mut bank, FrameOrigin::Manual, frame);
                for arm in bank.iter() {
                    prop_assert!(arm.alpha >= 1.0 && arm.alpha <= max_reward);
                    prop_assert!(arm.beta >= 1.0 && arm.beta <= max_reward);
                }
            }
        }
    }
}
