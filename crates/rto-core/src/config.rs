//! Learner configuration.
//!
//! All tunables are carried in immutable structs handed to the policy
//! constructors. Defaults are the values the experiment driver runs with.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default sliding window length (frames).
pub const WINDOW_SIZE_DEFAULT: usize = 150;

/// Default size of the discrete RTO/RTT domain.
pub const RTT_RANGE_DEFAULT: usize = 1000;

/// Default half-width of the promotion neighborhood.
pub const PROMOTION_RANGE_DEFAULT: usize = 5;

/// Configuration for the windowed Thompson-sampling learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Number of credit frames kept in the sliding window.
    pub window_size: usize,
    /// Number of arms; candidate RTOs are `0..rtt_range`.
    pub rtt_range: usize,
    /// Half-width of the promotion region around the observed RTT.
    pub promotion_range: usize,
    /// Promotion weight at the observed RTT itself.
    pub base_promote_weight: f64,
    /// Scale of demotion weights.
    pub base_demote_weight: f64,
    /// Lower clip bound for both Beta parameters.
    pub min_reward: f64,
    /// Upper clip bound for both Beta parameters.
    pub max_reward: f64,
    /// Seed value for both Beta parameters on every arm.
    pub arms_initial_weight: f64,
    /// Retract a still-windowed early-expiry frame when the real feedback
    /// for that packet arrives late.
    pub reconcile_late_feedback: bool,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE_DEFAULT,
            rtt_range: RTT_RANGE_DEFAULT,
            promotion_range: PROMOTION_RANGE_DEFAULT,
            base_promote_weight: 10.0,
            base_demote_weight: 1.0,
            min_reward: 1.0,
            max_reward: 1000.0,
            arms_initial_weight: 2.0,
            reconcile_late_feedback: true,
        }
    }
}

impl LearnerConfig {
    /// Short memory: reacts quickly to regime changes.
    pub fn short_memory() -> Self {
        Self {
            window_size: 50,
            ..Self::default()
        }
    }

    /// Long memory: smoother estimates on stable paths.
    pub fn long_memory() -> Self {
        Self {
            window_size: 500,
            ..Self::default()
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_rtt_range(mut self, rtt_range: usize) -> Self {
        self.rtt_range = rtt_range;
        self
    }

    pub fn with_promotion_range(mut self, promotion_range: usize) -> Self {
        self.promotion_range = promotion_range;
        self
    }

    pub fn with_weights(mut self, promote: f64, demote: f64) -> Self {
        self.base_promote_weight = promote;
        self.base_demote_weight = demote;
        self
    }

    pub fn with_reward_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_reward = min;
        self.max_reward = max;
        self
    }

    pub fn with_initial_weight(mut self, weight: f64) -> Self {
        self.arms_initial_weight = weight;
        self
    }

    pub fn with_reconciliation(mut self, enabled: bool) -> Self {
        self.reconcile_late_feedback = enabled;
        self
    }

    /// Check every option; the learner refuses to start on failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.rtt_range == 0 {
            return Err(ConfigError::ZeroRange);
        }
        if !(self.min_reward > 0.0) || !self.min_reward.is_finite() {
            return Err(ConfigError::NonPositiveMinReward(self.min_reward));
        }
        if !(self.min_reward <= self.max_reward) || !self.max_reward.is_finite() {
            return Err(ConfigError::InvertedRewardBounds {
                min: self.min_reward,
                max: self.max_reward,
            });
        }
        if !(self.min_reward..=self.max_reward).contains(&self.arms_initial_weight) {
            return Err(ConfigError::InitialWeightOutOfBounds {
                weight: self.arms_initial_weight,
                min: self.min_reward,
                max: self.max_reward,
            });
        }
        check_weight("base_promote_weight", self.base_promote_weight)?;
        check_weight("base_demote_weight", self.base_demote_weight)?;
        Ok(())
    }
}

fn check_weight(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidWeight { name, value })
    }
}

/// Configuration for the decaying Thompson policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayingConfig {
    /// Multiplier applied to every arm before each selection.
    pub decay_factor: f64,
    /// Standard deviation of the scatter around the observed RTT.
    pub variance: f64,
    /// Number of indices promoted per feedback.
    pub num_scatter: usize,
}

impl Default for DecayingConfig {
    fn default() -> Self {
        Self {
            decay_factor: 0.55,
            variance: 0.3,
            num_scatter: 10,
        }
    }
}

impl DecayingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(ConfigError::InvalidDecayFactor(self.decay_factor));
        }
        if !(self.variance.is_finite() && self.variance >= 0.0) {
            return Err(ConfigError::InvalidVariance(self.variance));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(LearnerConfig::default().validate().is_ok());
        assert!(LearnerConfig::short_memory().validate().is_ok());
        assert!(LearnerConfig::long_memory().validate().is_ok());
        assert!(DecayingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_window() {
        let config = LearnerConfig::default().with_window_size(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroWindow));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let config = LearnerConfig::default().with_reward_bounds(10.0, 5.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedRewardBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_initial_weight_outside_bounds() {
        let config = LearnerConfig::default().with_initial_weight(0.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InitialWeightOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_nan_weight() {
        let config = LearnerConfig::default().with_weights(f64::NAN, 1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { name: "base_promote_weight", .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LearnerConfig =
            serde_json::from_str(r#"{"window_size": 20, "rtt_range": 300}"#).unwrap();
        assert_eq!(config.window_size, 20);
        assert_eq!(config.rtt_range, 300);
        assert_eq!(config.promotion_range, PROMOTION_RANGE_DEFAULT);
        assert!(config.reconcile_late_feedback);
    }

    #[test]
    fn test_decaying_rejects_bad_factor() {
        let config = DecayingConfig {
            decay_factor: 1.5,
            ..DecayingConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidDecayFactor(1.5)));
    }
}
