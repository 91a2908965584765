//! # rto-dst
//!
//! Deterministic simulation of the world around the RTO learner: RTT
//! servers, delayed feedback delivery, a tick clock and the experiment loop.
//! All behavior is reproducible via a seed.
//!
//! ## Modules
//!
//! - `server`: simulated RTT servers (stable, random, drifting, volatile,
//!   adversarial, unreliable)
//! - `feedback_queue`: min-heap of delayed feedback
//! - `experiment`: the send/update loop and its results
//! - `harness`: multi-seed runs with invariant checking
//! - `scenarios`: server comparison and window-size sweep
//!
//! ## Usage
//!
//! ```rust
//! use rto_core::LearnerConfig;
//! use rto_dst::{run_with_policy, ExperimentConfig, PolicyKind, Server, ServerConfig};
//!
//! let learner = LearnerConfig::default().with_window_size(100);
//! let mut server = Server::new(ServerConfig::drifting(200), learner.rtt_range);
//! let results = run_with_policy(
//!     &ExperimentConfig::quick(),
//!     PolicyKind::Windowed,
//!     &learner,
//!     &mut server,
//!     12345,
//! )
//! .unwrap();
//! assert!(results.all_invariants_held());
//! ```
//!
//! ## Reproducibility
//!
//! Every harness line carries the seed it ran with. To replay a
//! `[FAIL] DST_SEED=<seed>` line on its own:
//! ```bash
//! rto-experiment harness --seeds 1 --seed <seed>
//! ```

pub mod clock;
pub mod error;
pub mod experiment;
pub mod feedback_queue;
pub mod harness;
pub mod scenarios;
pub mod server;

pub use clock::SimClock;
pub use error::ExperimentError;
pub use experiment::{
    build_policy, run_experiment, run_with_policy, ExperimentConfig, ExperimentResults,
    FeedbackDelay, PolicyKind,
};
pub use feedback_queue::FeedbackQueue;
pub use harness::{ExperimentHarness, HarnessConfig, HarnessResult};
pub use scenarios::{compare_servers, compare_window_sizes, WindowSweepPoint, WINDOW_SIZES_DEFAULT};
pub use server::{RttSource, Server, ServerConfig, RTT_SEQUENCE_1, RTT_SEQUENCE_2, RTT_SEQUENCE_3};

use tracing::info;

/// Get DST seed from environment or generate random one.
///
/// Logs the seed for reproduction. Use `DST_SEED=<seed>` to reproduce.
pub fn get_or_generate_seed() -> Result<u64, ExperimentError> {
    match std::env::var("DST_SEED") {
        Ok(s) => {
            let seed: u64 = s.trim().parse().map_err(|_| ExperimentError::InvalidSeed(s.clone()))?;
            info!(seed, "DST_SEED from environment");
            Ok(seed)
        }
        Err(_) => {
            let seed = rand::random::<u64>();
            info!(seed, "DST_SEED randomly generated");
            Ok(seed)
        }
    }
}
