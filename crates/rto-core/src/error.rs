//! Error types for the learning engine.
//!
//! The taxonomy is narrow: sampling and weight arithmetic cannot fail for
//! in-range inputs, so the only runtime error is an out-of-range RTO or RTT
//! handed in by the caller.

use thiserror::Error;

/// Errors returned by learner operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RtoError {
    /// A feedback value falls outside `[0, rtt_range)`.
    ///
    /// Signals a scheduling bug upstream. The learner rejects the whole
    /// batch without mutating any state.
    #[error("{field} {value} is outside [0, {rtt_range}) for packet {packet_id}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        rtt_range: usize,
        packet_id: u64,
    },

    #[error("invalid learner configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Rejected configuration options.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window_size must be positive")]
    ZeroWindow,

    #[error("rtt_range must be positive")]
    ZeroRange,

    #[error("min_reward must be positive, got {0}")]
    NonPositiveMinReward(f64),

    #[error("min_reward {min} exceeds max_reward {max}")]
    InvertedRewardBounds { min: f64, max: f64 },

    #[error("arms_initial_weight {weight} is outside [{min}, {max}]")]
    InitialWeightOutOfBounds { weight: f64, min: f64, max: f64 },

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("decay_factor must be in (0, 1], got {0}")]
    InvalidDecayFactor(f64),

    #[error("variance must be finite and non-negative, got {0}")]
    InvalidVariance(f64),
}
