//! Interchangeable RTO selection policies.
//!
//! | Policy | Selection | Learning |
//! |--------|-----------|----------|
//! | `WindowedThompson` | Thompson sampling | windowed credit frames, early demotion |
//! | `DecayingThompson` | Thompson sampling after global decay | Gaussian scatter around RTT |
//! | `Random` | uniform | none |
//!
//! The set is closed: `Policy` dispatches over the three variants.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::arm_bank::ArmBank;
use crate::config::{DecayingConfig, LearnerConfig};
use crate::error::RtoError;
use crate::feedback::{Feedback, PacketId};
use crate::invariants::InvariantResult;
use crate::learner::{UpdateReport, WindowedThompsonPolicy};
use crate::random::DeterministicRng;
use crate::selector::thompson_select;

/// Common surface of every policy.
pub trait RtoPolicy {
    fn name(&self) -> &'static str;

    /// Pick an RTO without tracking a packet.
    fn choose_rto(&mut self) -> usize;

    /// Pick an RTO for `packet_id`.
    fn send_packet(&mut self, packet_id: PacketId) -> usize;

    /// Consume one tick's feedback batch.
    fn update(&mut self, feedbacks: &[Feedback]) -> Result<UpdateReport, RtoError>;

    fn check_invariants(&self) -> Vec<InvariantResult> {
        Vec::new()
    }
}

impl RtoPolicy for WindowedThompsonPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn choose_rto(&mut self) -> usize {
        WindowedThompsonPolicy::choose_rto(self)
    }

    fn send_packet(&mut self, packet_id: PacketId) -> usize {
        WindowedThompsonPolicy::send_packet(self, packet_id)
    }

    fn update(&mut self, feedbacks: &[Feedback]) -> Result<UpdateReport, RtoError> {
        WindowedThompsonPolicy::update(self, feedbacks)
    }

    fn check_invariants(&self) -> Vec<InvariantResult> {
        WindowedThompsonPolicy::check_invariants(self)
    }
}

fn check_rtt(feedbacks: &[Feedback], rtt_range: usize) -> Result<(), RtoError> {
    for feedback in feedbacks {
        if feedback.rtt >= rtt_range {
            return Err(RtoError::OutOfRange {
                field: "observed_rtt",
                value: feedback.rtt,
                rtt_range,
                packet_id: feedback.packet_id,
            });
        }
    }
    Ok(())
}

// ============================================================================
// Random
// ============================================================================

/// Uniform RTO in `[0, rtt_range)`, ignoring feedback. Baseline.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rtt_range: usize,
    rng: DeterministicRng,
}

impl RandomPolicy {
    pub const NAME: &'static str = "RandomAgent";

    #[must_use]
    pub fn new(rtt_range: usize, rng: DeterministicRng) -> Self {
        debug_assert!(rtt_range > 0, "Range must hold at least one RTO");
        Self { rtt_range, rng }
    }
}

impl RtoPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn choose_rto(&mut self) -> usize {
        self.rng.gen_range(0..self.rtt_range)
    }

    fn send_packet(&mut self, _packet_id: PacketId) -> usize {
        self.choose_rto()
    }

    fn update(&mut self, feedbacks: &[Feedback]) -> Result<UpdateReport, RtoError> {
        check_rtt(feedbacks, self.rtt_range)?;
        Ok(UpdateReport::default())
    }
}

// ============================================================================
// Decaying Thompson
// ============================================================================

/// Thompson sampling that flattens every arm before each choice.
///
/// Feedback promotes `num_scatter` indices drawn from
/// `Normal(rtt, variance)`, each by one, capped at `max_reward`. Nothing is
/// ever demoted; old evidence fades through the decay instead.
#[derive(Debug, Clone)]
pub struct DecayingThompsonPolicy {
    config: DecayingConfig,
    max_reward: f64,
    arms: ArmBank,
    rng: DeterministicRng,
}

impl DecayingThompsonPolicy {
    pub const NAME: &'static str = "DecayingThompsonAgent";

    pub fn new(
        learner: &LearnerConfig,
        config: DecayingConfig,
        rng: DeterministicRng,
    ) -> Result<Self, RtoError> {
        learner.validate()?;
        config.validate()?;
        Ok(Self {
            arms: ArmBank::new(learner.rtt_range, learner.arms_initial_weight),
            max_reward: learner.max_reward,
            config,
            rng,
        })
    }

    pub fn arms(&self) -> &ArmBank {
        &self.arms
    }

    fn decay(&mut self) {
        let factor = self.config.decay_factor;
        for arm in self.arms.arms_mut() {
            arm.alpha *= factor;
            arm.beta *= factor;
        }
    }

    fn scatter(&mut self, rtt: usize) {
        let len = self.arms.len() as f64;
        let scatter = Normal::new(rtt as f64, self.config.variance).ok();
        for _ in 0..self.config.num_scatter {
            let index = match &scatter {
                Some(dist) => dist.sample(&mut self.rng).round(),
                None => rtt as f64,
            };
            if (0.0..len).contains(&index) {
                let arm = &mut self.arms.arms_mut()[index as usize];
                arm.alpha = (arm.alpha + 1.0).min(self.max_reward);
            }
        }
    }
}

impl RtoPolicy for DecayingThompsonPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn choose_rto(&mut self) -> usize {
        self.decay();
        thompson_select(&self.arms, &mut self.rng)
    }

    fn send_packet(&mut self, _packet_id: PacketId) -> usize {
        self.choose_rto()
    }

    fn update(&mut self, feedbacks: &[Feedback]) -> Result<UpdateReport, RtoError> {
        check_rtt(feedbacks, self.arms.len())?;
        for feedback in feedbacks {
            self.scatter(feedback.rtt);
        }
        Ok(UpdateReport::default())
    }
}

// ============================================================================
// Closed dispatch
// ============================================================================

/// One of the available policies.
#[derive(Debug, Clone)]
pub enum Policy {
    Windowed(WindowedThompsonPolicy),
    Decaying(DecayingThompsonPolicy),
    Random(RandomPolicy),
}

impl From<WindowedThompsonPolicy> for Policy {
    fn from(policy: WindowedThompsonPolicy) -> Self {
        Policy::Windowed(policy)
    }
}

impl From<DecayingThompsonPolicy> for Policy {
    fn from(policy: DecayingThompsonPolicy) -> Self {
        Policy::Decaying(policy)
    }
}

impl From<RandomPolicy> for Policy {
    fn from(policy: RandomPolicy) -> Self {
        Policy::Random(policy)
    }
}

impl RtoPolicy for Policy {
    fn name(&self) -> &'static str {
        match self {
            Policy::Windowed(p) => RtoPolicy::name(p),
            Policy::Decaying(p) => p.name(),
            Policy::Random(p) => p.name(),
        }
    }

    fn choose_rto(&mut self) -> usize {
        match self {
            Policy::Windowed(p) => RtoPolicy::choose_rto(p),
            Policy::Decaying(p) => p.choose_rto(),
            Policy::Random(p) => p.choose_rto(),
        }
    }

    fn send_packet(&mut self, packet_id: PacketId) -> usize {
        match self {
            Policy::Windowed(p) => RtoPolicy::send_packet(p, packet_id),
            Policy::Decaying(p) => p.send_packet(packet_id),
            Policy::Random(p) => p.send_packet(packet_id),
        }
    }

    fn update(&mut self, feedbacks: &[Feedback]) -> Result<UpdateReport, RtoError> {
        match self {
            Policy::Windowed(p) => RtoPolicy::update(p, feedbacks),
            Policy::Decaying(p) => p.update(feedbacks),
            Policy::Random(p) => p.update(feedbacks),
        }
    }

    fn check_invariants(&self) -> Vec<InvariantResult> {
        match self {
            Policy::Windowed(p) => RtoPolicy::check_invariants(p),
            Policy::Decaying(p) => p.check_invariants(),
            Policy::Random(p) => p.check_invariants(),
        }
    }
}
