//! Arm bank: one Beta `(alpha, beta)` pair per candidate RTO.
//!
//! `alpha` accumulates "this value was about right" credit and `beta`
//! accumulates "this value was wrong" credit. The length is fixed for the
//! lifetime of the bank.

use crate::frame::CreditFrame;

/// Beta distribution parameters for one arm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaParams {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaParams {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Posterior mean `alpha / (alpha + beta)`.
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }
}

/// Fixed-size bank of arms indexed by RTO value.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmBank {
    arms: Vec<BetaParams>,
}

impl ArmBank {
    /// Create a bank with both parameters of every arm set to `initial_weight`.
    #[must_use]
    pub fn new(rtt_range: usize, initial_weight: f64) -> Self {
        debug_assert!(rtt_range > 0, "Arm bank must have at least one arm");
        Self {
            arms: vec![BetaParams::new(initial_weight, initial_weight); rtt_range],
        }
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<BetaParams> {
        self.arms.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BetaParams> {
        self.arms.iter()
    }

    pub fn as_slice(&self) -> &[BetaParams] {
        &self.arms
    }

    /// Mutable access for policies that reshape the whole bank.
    pub(crate) fn arms_mut(&mut self) -> &mut [BetaParams] {
        &mut self.arms
    }

    /// Add a frame element-wise.
    pub fn add_frame(&mut self, frame: &CreditFrame) {
        self.accumulate(frame, 1.0);
    }

    /// Subtract a frame element-wise.
    pub fn subtract_frame(&mut self, frame: &CreditFrame) {
        self.accumulate(frame, -1.0);
    }

    fn accumulate(&mut self, frame: &CreditFrame, sign: f64) {
        for (i, w) in frame.promote().iter() {
            debug_assert!(i < self.arms.len(), "Frame index {} beyond bank", i);
            self.arms[i].alpha += sign * w;
        }
        for (i, w) in frame.demote().iter() {
            debug_assert!(i < self.arms.len(), "Frame index {} beyond bank", i);
            self.arms[i].beta += sign * w;
        }
    }

    /// Clip every parameter into `[min, max]`.
    ///
    /// Returns the number of parameters that were moved by the clip.
    pub fn clip(&mut self, min: f64, max: f64) -> usize {
        debug_assert!(min <= max, "Inverted clip bounds");
        let mut clipped_count = 0;
        for arm in &mut self.arms {
            for value in [&mut arm.alpha, &mut arm.beta] {
                let bounded = value.clamp(min, max);
                if bounded != *value {
                    *value = bounded;
                    clipped_count += 1;
                }
            }
        }
        clipped_count
    }

    /// Arm with the highest posterior mean (first on ties).
    pub fn best_mean_arm(&self) -> usize {
        let mut best = 0;
        let mut best_mean = f64::NEG_INFINITY;
        for (i, arm) in self.arms.iter().enumerate() {
            let mean = arm.mean();
            if mean > best_mean {
                best_mean = mean;
                best = i;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LearnerConfig;

    #[test]
    fn test_new_bank_is_uniform() {
        let bank = ArmBank::new(10, 2.0);
        assert_eq!(bank.len(), 10);
        assert!(bank.iter().all(|a| a.alpha == 2.0 && a.beta == 2.0));
        assert_eq!(bank.get(10), None);
    }

    #[test]
    fn test_add_then_subtract_restores() {
        let mut bank = ArmBank::new(20, 2.0);
        let config = LearnerConfig::default()
            .with_rtt_range(20)
            .with_promotion_range(3);
        let frame = CreditFrame::on_feedback(&config, 10, 8);
        let before = bank.clone();

        bank.add_frame(&frame);
        assert!(bank.get(8).unwrap().alpha > 2.0);

        bank.subtract_frame(&frame);
        for (a, b) in bank.iter().zip(before.iter()) {
            assert!((a.alpha - b.alpha).abs() < 1e-12);
            assert!((a.beta - b.beta).abs() < 1e-12);
        }
    }

    #[test]
    fn test_clip_counts_moved_values() {
        let mut bank = ArmBank::new(3, 2.0);
        bank.arms_mut()[0].alpha = 0.2;
        bank.arms_mut()[2].beta = 50.0;

        assert_eq!(bank.clip(1.0, 10.0), 2);
        assert_eq!(bank.get(0).unwrap().alpha, 1.0);
        assert_eq!(bank.get(2).unwrap().beta, 10.0);
        assert_eq!(bank.clip(1.0, 10.0), 0);
    }

    #[test]
    fn test_best_mean_arm() {
        let mut bank = ArmBank::new(5, 2.0);
        assert_eq!(bank.best_mean_arm(), 0);
        bank.arms_mut()[3].alpha = 9.0;
        assert_eq!(bank.best_mean_arm(), 3);
    }
}
