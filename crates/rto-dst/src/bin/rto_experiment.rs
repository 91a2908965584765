//! rto-experiment: run simulated RTO learning experiments.
//!
//! # Usage
//!
//! ```bash
//! rto-experiment single --policy windowed --server drifting --rtt 200
//! rto-experiment servers --rounds 10000
//! rto-experiment window-sweep --window-sizes 1,50,100,300,500,1000
//! rto-experiment harness --seeds 16
//! ```
//!
//! Outputs JSON to stdout. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, Level};

use rto_core::LearnerConfig;
use rto_dst::scenarios::{default_servers, sweep_servers};
use rto_dst::{
    compare_servers, compare_window_sizes, get_or_generate_seed, run_with_policy,
    ExperimentConfig, ExperimentError, ExperimentHarness, FeedbackDelay, HarnessConfig,
    PolicyKind, Server, ServerConfig, RTT_SEQUENCE_2, WINDOW_SIZES_DEFAULT,
};

/// Maximum rounds accepted from the command line.
const ROUNDS_MAX: u64 = 10_000_000;

/// Simulated experiments for windowed Thompson-sampling RTO selection.
#[derive(Parser, Debug)]
#[command(name = "rto-experiment")]
#[command(about = "Simulated RTO learning experiments")]
struct Cli {
    /// Seed (falls back to DST_SEED, then random).
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Number of ticks per experiment.
    #[arg(long, global = true, default_value_t = 10_000)]
    rounds: u64,

    /// JSON file with learner configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the learner window size.
    #[arg(long, global = true)]
    window_size: Option<usize>,

    /// Deliver feedback after a fixed number of ticks instead of after the RTT.
    #[arg(long, global = true)]
    fixed_delay: Option<u64>,

    /// Debug-level logging.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One policy against one server.
    Single {
        #[arg(long, value_enum, default_value = "windowed")]
        policy: PolicyKind,

        #[arg(long, value_enum, default_value = "drifting")]
        server: ServerPreset,

        /// Center RTT for stable, drifting, volatile and unreliable servers.
        #[arg(long, default_value_t = 200)]
        rtt: usize,
    },
    /// One policy against every server type.
    Servers {
        #[arg(long, value_enum, default_value = "windowed")]
        policy: PolicyKind,
    },
    /// Total regret per window size.
    WindowSweep {
        #[arg(long, value_delimiter = ',')]
        window_sizes: Option<Vec<usize>>,
    },
    /// Multi-seed run with invariant checks.
    Harness {
        #[arg(long, default_value_t = 8)]
        seeds: u64,

        /// Check invariants every N ticks.
        #[arg(long, default_value_t = 100)]
        check_interval: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ServerPreset {
    Stable,
    Random,
    Drifting,
    Volatile,
    Adversarial,
    Unreliable,
}

impl ServerPreset {
    fn build(self, rtt: usize, rounds: u64) -> ServerConfig {
        match self {
            ServerPreset::Stable => ServerConfig::Stable { rtt },
            ServerPreset::Random => ServerConfig::Random,
            ServerPreset::Drifting => ServerConfig::drifting(rtt),
            ServerPreset::Volatile => ServerConfig::volatile(rtt),
            ServerPreset::Adversarial => ServerConfig::adversarial(RTT_SEQUENCE_2, rounds),
            ServerPreset::Unreliable => ServerConfig::unreliable(rtt),
        }
    }
}

fn load_learner_config(
    path: Option<&Path>,
    window_size: Option<usize>,
) -> Result<LearnerConfig, ExperimentError> {
    let mut config = match path {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => LearnerConfig::default().with_window_size(100),
    };
    if let Some(window_size) = window_size {
        config = config.with_window_size(window_size);
    }
    config.validate().map_err(rto_core::RtoError::from)?;
    Ok(config)
}

fn run(cli: Cli) -> Result<serde_json::Value, ExperimentError> {
    let seed = match cli.seed {
        Some(seed) => seed,
        None => get_or_generate_seed()?,
    };
    let learner = load_learner_config(cli.config.as_deref(), cli.window_size)?;
    let rounds = cli.rounds.min(ROUNDS_MAX);
    let experiment = ExperimentConfig {
        rounds,
        feedback_delay: match cli.fixed_delay {
            Some(ticks) => FeedbackDelay::Fixed { ticks },
            None => FeedbackDelay::Rtt,
        },
        ..ExperimentConfig::default()
    };

    let value = match cli.command {
        Command::Single { policy, server, rtt } => {
            let mut server = Server::new(server.build(rtt, rounds), learner.rtt_range);
            let results = run_with_policy(&experiment, policy, &learner, &mut server, seed)?;
            serde_json::to_value(results)?
        }
        Command::Servers { policy } => {
            let servers = default_servers(rounds);
            let results = compare_servers(&experiment, policy, &learner, &servers, seed)?;
            serde_json::to_value(results)?
        }
        Command::WindowSweep { window_sizes } => {
            let window_sizes = window_sizes.unwrap_or_else(|| WINDOW_SIZES_DEFAULT.to_vec());
            let servers = sweep_servers(rounds);
            let points =
                compare_window_sizes(&experiment, &learner, &window_sizes, &servers, seed)?;
            serde_json::to_value(points)?
        }
        Command::Harness { seeds, check_interval } => {
            let config = HarnessConfig {
                seeds_count: seeds.max(1),
                experiment: ExperimentConfig {
                    invariant_check_interval: check_interval,
                    ..experiment
                },
                learner,
                ..HarnessConfig::default()
            };
            let results = ExperimentHarness::new(seed, config).run()?;
            for result in &results {
                eprintln!("{}", result.format());
            }
            serde_json::to_value(results)?
        }
    };
    Ok(value)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).and_then(|value| Ok(serde_json::to_string_pretty(&value)?)) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
