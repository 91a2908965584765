//! Simulated send/feedback loop.
//!
//! # Tick
//!
//! ```text
//! for t in 1..=rounds:
//!   rto = policy.send_packet(t)
//!   rtt = server.sample()
//!   queue Feedback(rto, rtt, arrival = t + delay, t)   unless lost
//!   t % period_updates == 0  -> record period, reset period counters
//!   policy.update(queue.drain_ready(t))
//!   regret += |rto - rtt|, count rto above / below rtt
//! ```
//!
//! With `FeedbackDelay::Rtt` a packet's feedback arrives exactly `rtt` ticks
//! after it was sent, so a timeout shorter than the RTT always expires first.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use rto_core::{
    DecayingConfig, DecayingThompsonPolicy, DeterministicRng, Feedback, LearnerConfig, Policy,
    RandomPolicy, RtoError, RtoPolicy, WindowedThompsonPolicy,
};

use crate::clock::SimClock;
use crate::error::ExperimentError;
use crate::feedback_queue::FeedbackQueue;
use crate::server::RttSource;

/// Ticks between period records.
pub const PERIOD_UPDATES_DEFAULT: u64 = 100;

/// Stream labels for forking the experiment RNG.
const POLICY_STREAM: u64 = 1;
const SERVER_STREAM: u64 = 2;

/// How long feedback takes to come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedbackDelay {
    /// Feedback arrives `rtt` ticks after sending.
    Rtt,
    /// Feedback arrives a fixed number of ticks after sending.
    Fixed { ticks: u64 },
}

/// Experiment loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub rounds: u64,
    pub period_updates: u64,
    pub feedback_delay: FeedbackDelay,
    /// Check policy invariants every N ticks (0 = never).
    pub invariant_check_interval: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            rounds: 10_000,
            period_updates: PERIOD_UPDATES_DEFAULT,
            feedback_delay: FeedbackDelay::Rtt,
            invariant_check_interval: 0,
        }
    }
}

impl ExperimentConfig {
    /// Short run with frequent invariant checks.
    pub fn quick() -> Self {
        Self {
            rounds: 2_000,
            invariant_check_interval: 50,
            ..Self::default()
        }
    }

    /// Long run with periodic invariant checks.
    pub fn thorough() -> Self {
        Self {
            rounds: 50_000,
            invariant_check_interval: 500,
            ..Self::default()
        }
    }

    pub fn with_rounds(mut self, rounds: u64) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.rounds == 0 {
            return Err(ExperimentError::InvalidExperiment("rounds must be positive"));
        }
        if self.period_updates == 0 {
            return Err(ExperimentError::InvalidExperiment("period_updates must be positive"));
        }
        Ok(())
    }
}

/// Which policy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Windowed,
    Decaying,
    Random,
}

/// Build a policy from its kind and configuration.
pub fn build_policy(
    kind: PolicyKind,
    config: &LearnerConfig,
    rng: DeterministicRng,
) -> Result<Policy, RtoError> {
    Ok(match kind {
        PolicyKind::Windowed => WindowedThompsonPolicy::new(config.clone(), rng)?.into(),
        PolicyKind::Decaying => {
            DecayingThompsonPolicy::new(config, DecayingConfig::default(), rng)?.into()
        }
        PolicyKind::Random => {
            config.validate()?;
            RandomPolicy::new(config.rtt_range, rng).into()
        }
    })
}

/// Outcome of one experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResults {
    pub policy: String,
    pub server: String,
    pub seed: u64,
    pub rounds: u64,
    /// Average `|rto - rtt|` per period.
    pub accumulated_average_loss: Vec<f64>,
    /// RTO chosen at each period boundary.
    pub chosen_rtos: Vec<usize>,
    /// RTT observed at each period boundary.
    pub actual_rtts: Vec<usize>,
    pub total_regret: u64,
    pub rto_above_count: u64,
    pub rto_below_count: u64,
    pub lost_count: u64,
    pub expired_count: u64,
    pub reconciled_count: u64,
    pub invariant_checks_count: u64,
    pub first_violation: Option<String>,
}

impl ExperimentResults {
    pub fn all_invariants_held(&self) -> bool {
        self.first_violation.is_none()
    }

    /// Mean regret per tick over the whole run.
    pub fn average_regret(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.total_regret as f64 / self.rounds as f64
        }
    }
}

#[derive(Debug, Default)]
struct PeriodCounters {
    regret: u64,
    above_count: u64,
    below_count: u64,
}

/// Run one experiment with RNG streams forked from `seed`.
pub fn run_experiment<P, S>(
    config: &ExperimentConfig,
    policy: &mut P,
    server: &mut S,
    seed: u64,
) -> Result<ExperimentResults, ExperimentError>
where
    P: RtoPolicy + ?Sized,
    S: RttSource,
{
    config.validate()?;
    let mut server_rng = DeterministicRng::new(seed).fork(SERVER_STREAM);

    info!(
        seed,
        rounds = config.rounds,
        policy = policy.name(),
        server = server.name(),
        "starting experiment"
    );

    let mut results = ExperimentResults {
        policy: policy.name().to_string(),
        server: server.name().to_string(),
        seed,
        rounds: config.rounds,
        ..ExperimentResults::default()
    };
    let mut clock = SimClock::new();
    let mut queue = FeedbackQueue::new();
    let mut period = PeriodCounters::default();

    while clock.now() < config.rounds {
        let t = clock.tick();

        let rto = policy.send_packet(t);
        let rtt = server.sample(&mut server_rng);
        if server.delivered(&mut server_rng) {
            let delay = match config.feedback_delay {
                FeedbackDelay::Rtt => rtt as u64,
                FeedbackDelay::Fixed { ticks } => ticks,
            };
            queue.push(Feedback::new(rto, rtt, t + delay, t));
        } else {
            results.lost_count += 1;
        }

        if t % config.period_updates == 0 {
            debug!(t, regret = period.regret, rto, rtt, "period boundary");
            results
                .accumulated_average_loss
                .push(period.regret as f64 / config.period_updates as f64);
            results.chosen_rtos.push(rto);
            results.actual_rtts.push(rtt);
            results.rto_above_count += period.above_count;
            results.rto_below_count += period.below_count;
            period = PeriodCounters::default();
        }

        let report = policy.update(&queue.drain_ready(t))?;
        results.expired_count += report.expired.len() as u64;
        results.reconciled_count += report.reconciled.len() as u64;

        let regret = rto.abs_diff(rtt) as u64;
        period.regret += regret;
        results.total_regret += regret;
        if rto > rtt {
            period.above_count += 1;
        } else {
            period.below_count += 1;
        }

        if config.invariant_check_interval > 0 && t % config.invariant_check_interval == 0 {
            results.invariant_checks_count += 1;
            if let Some(violated) = policy.check_invariants().into_iter().find(|r| !r.holds) {
                let message = format!(
                    "t={}: {} violated: {}",
                    t,
                    violated.name,
                    violated.message.unwrap_or_default()
                );
                warn!(seed, %message, "invariant violated, stopping experiment");
                results.first_violation = Some(message);
                break;
            }
        }
    }

    results.rto_above_count += period.above_count;
    results.rto_below_count += period.below_count;

    info!(
        seed,
        total_regret = results.total_regret,
        rto_above = results.rto_above_count,
        rto_below = results.rto_below_count,
        expired = results.expired_count,
        "experiment finished"
    );
    Ok(results)
}

/// Build the policy for `kind` on the seed's policy stream and run it.
pub fn run_with_policy<S: RttSource>(
    config: &ExperimentConfig,
    kind: PolicyKind,
    learner: &LearnerConfig,
    server: &mut S,
    seed: u64,
) -> Result<ExperimentResults, ExperimentError> {
    let rng = DeterministicRng::new(seed).fork(POLICY_STREAM);
    let mut policy = build_policy(kind, learner, rng)?;
    run_experiment(config, &mut policy, server, seed)
}
