//! Comparison scenarios.
//!
//! - `compare_servers`: one policy against each server type.
//! - `compare_window_sizes`: total regret of the windowed learner per window
//!   size, against an adversarial and a drifting server.
//!
//! Every run gets a freshly built policy; servers are reset between runs.

use serde::{Deserialize, Serialize};

use rto_core::LearnerConfig;

use crate::error::ExperimentError;
use crate::experiment::{run_with_policy, ExperimentConfig, ExperimentResults, PolicyKind};
use crate::server::{RttSource, Server, ServerConfig, RTT_SEQUENCE_2, RTT_SEQUENCE_3};

pub const WINDOW_SIZES_DEFAULT: &[usize] = &[1, 50, 100, 300, 500, 1000];

/// Servers used when comparing server types.
pub fn default_servers(rounds: u64) -> Vec<ServerConfig> {
    vec![
        ServerConfig::Random,
        ServerConfig::Drifting {
            rtt: 200,
            variance: 6.0,
            switch_prob: 0.01,
        },
        ServerConfig::volatile(0),
        ServerConfig::adversarial(RTT_SEQUENCE_3, rounds),
    ]
}

/// Servers used in the window-size sweep.
pub fn sweep_servers(rounds: u64) -> Vec<ServerConfig> {
    vec![
        ServerConfig::adversarial(RTT_SEQUENCE_2, rounds),
        ServerConfig::Drifting {
            rtt: 200,
            variance: 6.0,
            switch_prob: 0.01,
        },
    ]
}

/// Run `policy` against every server in `servers`.
pub fn compare_servers(
    experiment: &ExperimentConfig,
    policy: PolicyKind,
    learner: &LearnerConfig,
    servers: &[ServerConfig],
    seed: u64,
) -> Result<Vec<ExperimentResults>, ExperimentError> {
    servers
        .iter()
        .map(|config| {
            let mut server = Server::new(config.clone(), learner.rtt_range);
            run_with_policy(experiment, policy, learner, &mut server, seed)
        })
        .collect()
}

/// One point of a window-size sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSweepPoint {
    pub server: String,
    pub window_size: usize,
    pub total_regret: u64,
    pub expired_count: u64,
}

/// Total regret of the windowed learner for each window size on each server.
pub fn compare_window_sizes(
    experiment: &ExperimentConfig,
    learner: &LearnerConfig,
    window_sizes: &[usize],
    servers: &[ServerConfig],
    seed: u64,
) -> Result<Vec<WindowSweepPoint>, ExperimentError> {
    let mut points = Vec::with_capacity(window_sizes.len() * servers.len());
    for config in servers {
        let mut server = Server::new(config.clone(), learner.rtt_range);
        for &window_size in window_sizes {
            server.reset();
            let learner = learner.clone().with_window_size(window_size);
            let results =
                run_with_policy(experiment, PolicyKind::Windowed, &learner, &mut server, seed)?;
            points.push(WindowSweepPoint {
                server: results.server,
                window_size,
                total_regret: results.total_regret,
                expired_count: results.expired_count,
            });
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_servers_one_result_per_server() {
        let experiment = ExperimentConfig::default().with_rounds(300);
        let results = compare_servers(
            &experiment,
            PolicyKind::Windowed,
            &LearnerConfig::default().with_window_size(100),
            &default_servers(300),
            1,
        )
        .unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.server.as_str()).collect();
        assert_eq!(
            names,
            vec!["RandomServer", "DriftingServer", "VolatileServer", "AdversarialServer"]
        );
    }

    #[test]
    fn test_window_sweep_resets_server_between_runs() {
        let experiment = ExperimentConfig::default().with_rounds(200);
        let servers = vec![ServerConfig::adversarial(RTT_SEQUENCE_3, 200)];
        let learner = LearnerConfig::default();
        let points = compare_window_sizes(&experiment, &learner, &[10, 10], &servers, 4).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].total_regret, points[1].total_regret);
    }

    #[test]
    fn test_window_sweep_covers_grid() {
        let experiment = ExperimentConfig::default().with_rounds(100);
        let points = compare_window_sizes(
            &experiment,
            &LearnerConfig::default(),
            &[1, 50],
            &sweep_servers(100),
            2,
        )
        .unwrap();
        let grid: Vec<(&str, usize)> = points
            .iter()
            .map(|p| (p.server.as_str(), p.window_size))
            .collect();
        assert_eq!(
            grid,
            vec![
                ("AdversarialServer", 1),
                ("AdversarialServer", 50),
                ("DriftingServer", 1),
                ("DriftingServer", 50),
            ]
        );
    }
}
