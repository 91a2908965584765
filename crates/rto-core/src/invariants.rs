//! Learner state invariants.
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | BankSize | One arm per candidate RTO in `[0, rtt_range)` |
//! | ParamsBounded | Every alpha and beta lies in `[min_reward, max_reward]` |
//! | WindowLength | Window holds exactly `window_size` frames |
//! | WindowAccounting | `bank - initial == sum(windowed frames)` until the first clip |

use crate::arm_bank::ArmBank;
use crate::config::LearnerConfig;
use crate::window::SlidingWindow;

/// Absolute tolerance for floating-point accounting.
const ACCOUNTING_TOLERANCE: f64 = 1e-6;

/// Result of checking an invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantResult {
    pub name: &'static str,
    pub holds: bool,
    pub message: Option<String>,
}

impl InvariantResult {
    pub fn holds(name: &'static str) -> Self {
        Self {
            name,
            holds: true,
            message: None,
        }
    }

    pub fn violated(name: &'static str, message: String) -> Self {
        Self {
            name,
            holds: false,
            message: Some(message),
        }
    }
}

pub fn check_bank_size(bank: &ArmBank, config: &LearnerConfig) -> InvariantResult {
    if bank.len() == config.rtt_range {
        InvariantResult::holds("BankSize")
    } else {
        InvariantResult::violated(
            "BankSize",
            format!("Bank has {} arms but rtt_range is {}", bank.len(), config.rtt_range),
        )
    }
}

pub fn check_bounds(bank: &ArmBank, config: &LearnerConfig) -> InvariantResult {
    let bounds = config.min_reward..=config.max_reward;
    for (i, arm) in bank.iter().enumerate() {
        if !bounds.contains(&arm.alpha) || !bounds.contains(&arm.beta) {
            return InvariantResult::violated(
                "ParamsBounded",
                format!(
                    "Arm {} has (alpha={}, beta={}) outside [{}, {}]",
                    i, arm.alpha, arm.beta, config.min_reward, config.max_reward
                ),
            );
        }
    }
    InvariantResult::holds("ParamsBounded")
}

pub fn check_window_length(window: &SlidingWindow, config: &LearnerConfig) -> InvariantResult {
    if window.len() == config.window_size {
        InvariantResult::holds("WindowLength")
    } else {
        InvariantResult::violated(
            "WindowLength",
            format!("Window holds {} frames, expected {}", window.len(), config.window_size),
        )
    }
}

/// Holds vacuously once clipping has moved any value.
pub fn check_window_accounting(
    bank: &ArmBank,
    window: &SlidingWindow,
    config: &LearnerConfig,
) -> InvariantResult {
    if window.is_saturated() {
        return InvariantResult::holds("WindowAccounting");
    }

    let (promote, demote) = window.totals(bank.len());
    let initial = config.arms_initial_weight;
    for (i, arm) in bank.iter().enumerate() {
        let alpha_drift = (arm.alpha - initial - promote[i]).abs();
        let beta_drift = (arm.beta - initial - demote[i]).abs();
        if alpha_drift > ACCOUNTING_TOLERANCE || beta_drift > ACCOUNTING_TOLERANCE {
            return InvariantResult::violated(
                "WindowAccounting",
                format!(
                    "Arm {} is (alpha={}, beta={}) but window sums to (+{}, +{}) over initial {}",
                    i, arm.alpha, arm.beta, promote[i], demote[i], initial
                ),
            );
        }
    }
    InvariantResult::holds("WindowAccounting")
}

/// Run every invariant.
pub fn check_all(
    bank: &ArmBank,
    window: &SlidingWindow,
    config: &LearnerConfig,
) -> Vec<InvariantResult> {
    vec![
        check_bank_size(bank, config),
        check_bounds(bank, config),
        check_window_length(window, config),
        check_window_accounting(bank, window, config),
    ]
}
