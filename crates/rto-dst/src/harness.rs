//! Multi-seed experiment harness.
//!
//! Runs the same experiment under several seeds derived from one base seed,
//! checking policy invariants along the way. Every run reports a line that
//! can be replayed with `DST_SEED=<seed>`.

use serde::{Deserialize, Serialize};
use tracing::info;

use rto_core::{DeterministicRng, LearnerConfig};

use crate::error::ExperimentError;
use crate::experiment::{run_with_policy, ExperimentConfig, PolicyKind};
use crate::server::{Server, ServerConfig};

/// Configuration for the harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Number of seeds to run.
    pub seeds_count: u64,
    pub experiment: ExperimentConfig,
    pub learner: LearnerConfig,
    pub server: ServerConfig,
    pub policy: PolicyKind,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seeds_count: 8,
            experiment: ExperimentConfig {
                invariant_check_interval: 100,
                ..ExperimentConfig::default()
            },
            learner: LearnerConfig::default().with_window_size(100),
            server: ServerConfig::drifting(200),
            policy: PolicyKind::Windowed,
        }
    }
}

impl HarnessConfig {
    /// Configuration for quick testing.
    pub fn quick() -> Self {
        Self {
            seeds_count: 3,
            experiment: ExperimentConfig::quick(),
            ..Self::default()
        }
    }

    /// Configuration for stress testing.
    pub fn stress() -> Self {
        Self {
            seeds_count: 32,
            experiment: ExperimentConfig::thorough(),
            ..Self::default()
        }
    }
}

/// Result of one seeded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessResult {
    /// Seed used for reproduction
    pub seed: u64,
    pub rounds: u64,
    pub total_regret: u64,
    pub expired_count: u64,
    pub invariant_checks_count: u64,
    pub all_invariants_held: bool,
    pub first_violation: Option<String>,
}

impl HarnessResult {
    /// Format for display.
    pub fn format(&self) -> String {
        let status = if self.all_invariants_held { "PASS" } else { "FAIL" };

        let mut result = format!(
            "[{}] DST_SEED={} rounds={} regret={} expired={} checks={}",
            status,
            self.seed,
            self.rounds,
            self.total_regret,
            self.expired_count,
            self.invariant_checks_count
        );

        if let Some(ref violation) = self.first_violation {
            result.push_str(&format!("\n  Violation: {}", violation));
        }

        result
    }
}

/// Seeded experiment runner.
#[derive(Debug, Clone)]
pub struct ExperimentHarness {
    base_seed: u64,
    config: HarnessConfig,
}

impl ExperimentHarness {
    #[must_use]
    pub fn new(base_seed: u64, config: HarnessConfig) -> Self {
        debug_assert!(config.seeds_count > 0, "Must run at least one seed");
        Self { base_seed, config }
    }

    /// Seeds derived from the base seed; the first is the base seed itself.
    pub fn seeds(&self) -> Vec<u64> {
        let root = DeterministicRng::new(self.base_seed);
        std::iter::once(self.base_seed)
            .chain((1..self.config.seeds_count).map(|i| root.fork(i).seed()))
            .collect()
    }

    /// Run one seed.
    pub fn run_seed(&self, seed: u64) -> Result<HarnessResult, ExperimentError> {
        let mut server = Server::new(self.config.server.clone(), self.config.learner.rtt_range);
        let results = run_with_policy(
            &self.config.experiment,
            self.config.policy,
            &self.config.learner,
            &mut server,
            seed,
        )?;
        Ok(HarnessResult {
            seed,
            rounds: results.rounds,
            total_regret: results.total_regret,
            expired_count: results.expired_count,
            invariant_checks_count: results.invariant_checks_count,
            all_invariants_held: results.all_invariants_held(),
            first_violation: results.first_violation,
        })
    }

    /// Run every seed.
    pub fn run(&self) -> Result<Vec<HarnessResult>, ExperimentError> {
        let results = self
            .seeds()
            .into_iter()
            .map(|seed| self.run_seed(seed))
            .collect::<Result<Vec<_>, _>>()?;

        let failed_count = results.iter().filter(|r| !r.all_invariants_held).count();
        info!(
            base_seed = self.base_seed,
            seeds = results.len(),
            failed = failed_count,
            "harness finished"
        );
        Ok(results)
    }
}
