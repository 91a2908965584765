//! Simulated RTT servers.
//!
//! | Server | Behaviour |
//! |--------|-----------|
//! | Stable | constant RTT |
//! | Random | uniform in `[0, rtt_range)` every call |
//! | Drifting | Gaussian around a center; the sample becomes the new center with `switch_prob` |
//! | Volatile | Gaussian around a center; jumps to a uniform center with `jump_prob` |
//! | Adversarial | walks through a sequence of centers over a fixed number of rounds |
//! | Unreliable | constant RTT, feedback lost with probability `1 - receive_prob` |
//!
//! Samples are rounded, made non-negative and clamped into `[0, rtt_range)`.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Spread used around each adversarial center.
const ADVERSARIAL_VARIANCE: f64 = 4.0;

pub const RTT_SEQUENCE_1: &[usize] = &[500, 400, 300, 200, 100, 900];
pub const RTT_SEQUENCE_2: &[usize] = &[
    500, 400, 300, 200, 100, 900, 456, 127, 984, 652, 222, 123, 399, 700, 421, 2, 635,
];
pub const RTT_SEQUENCE_3: &[usize] = &[900, 100, 500, 200];

/// Source of round-trip times for the experiment loop.
pub trait RttSource {
    fn name(&self) -> &'static str;

    /// Next RTT.
    fn sample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize;

    /// Whether the packet just sampled gets its feedback back.
    fn delivered<R: Rng + ?Sized>(&mut self, _rng: &mut R) -> bool {
        true
    }

    /// Restore the initial state.
    fn reset(&mut self) {}
}

/// Serializable server description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerConfig {
    Stable { rtt: usize },
    Random,
    Drifting { rtt: usize, variance: f64, switch_prob: f64 },
    Volatile { rtt: usize, variance: f64, jump_prob: f64 },
    Adversarial { sequence: Vec<usize>, rounds: u64 },
    Unreliable { rtt: usize, receive_prob: f64 },
}

impl ServerConfig {
    pub fn drifting(rtt: usize) -> Self {
        ServerConfig::Drifting {
            rtt,
            variance: 4.0,
            switch_prob: 0.01,
        }
    }

    pub fn volatile(rtt: usize) -> Self {
        ServerConfig::Volatile {
            rtt,
            variance: 6.0,
            jump_prob: 0.0003,
        }
    }

    pub fn adversarial(sequence: &[usize], rounds: u64) -> Self {
        ServerConfig::Adversarial {
            sequence: sequence.to_vec(),
            rounds,
        }
    }

    pub fn unreliable(rtt: usize) -> Self {
        ServerConfig::Unreliable { rtt, receive_prob: 0.9 }
    }
}

/// A running server: configuration plus drift state.
#[derive(Debug, Clone)]
pub struct Server {
    config: ServerConfig,
    rtt_range: usize,
    /// Current center for Drifting/Volatile.
    center: usize,
    /// Calls so far, for Adversarial.
    calls_count: u64,
    /// Current position in the Adversarial sequence.
    sequence_index: usize,
}

impl Server {
    #[must_use]
    pub fn new(config: ServerConfig, rtt_range: usize) -> Self {
        debug_assert!(rtt_range > 0, "RTT range must be positive");
        if let ServerConfig::Adversarial { sequence, rounds } = &config {
            debug_assert!(!sequence.is_empty(), "Adversarial sequence must not be empty");
            debug_assert!(*rounds > 0, "Adversarial rounds must be positive");
        }
        let center = Self::initial_center(&config);
        Self {
            config,
            rtt_range,
            center,
            calls_count: 0,
            sequence_index: 0,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn initial_center(config: &ServerConfig) -> usize {
        match config {
            ServerConfig::Stable { rtt }
            | ServerConfig::Drifting { rtt, .. }
            | ServerConfig::Volatile { rtt, .. }
            | ServerConfig::Unreliable { rtt, .. } => *rtt,
            ServerConfig::Adversarial { sequence, .. } => sequence.first().copied().unwrap_or(0),
            ServerConfig::Random => 0,
        }
    }

    fn clamp(&self, value: f64) -> usize {
        let magnitude = value.round().abs();
        (magnitude as usize).min(self.rtt_range - 1)
    }

    fn gaussian<R: Rng + ?Sized>(&self, center: usize, variance: f64, rng: &mut R) -> usize {
        match Normal::new(center as f64, variance) {
            Ok(dist) => self.clamp(dist.sample(rng)),
            Err(_) => self.clamp(center as f64),
        }
    }

    /// Index to use for this call; moves forward as calls progress through `rounds`.
    fn next_sequence_index(&self, len: usize, rounds: u64) -> usize {
        let progress = (self.calls_count as f64 / rounds as f64 * len as f64) as usize;
        if progress > self.sequence_index && self.sequence_index + 1 < len {
            self.sequence_index + 1
        } else {
            self.sequence_index
        }
    }
}

impl RttSource for Server {
    fn name(&self) -> &'static str {
        match self.config {
            ServerConfig::Stable { .. } => "StableServer",
            ServerConfig::Random => "RandomServer",
            ServerConfig::Drifting { .. } => "DriftingServer",
            ServerConfig::Volatile { .. } => "VolatileServer",
            ServerConfig::Adversarial { .. } => "AdversarialServer",
            ServerConfig::Unreliable { .. } => "UnreliableServer",
        }
    }

    fn sample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        match &self.config {
            ServerConfig::Stable { rtt } | ServerConfig::Unreliable { rtt, .. } => {
                (*rtt).min(self.rtt_range - 1)
            }
            ServerConfig::Random => rng.gen_range(0..self.rtt_range),
            ServerConfig::Drifting { variance, switch_prob, .. } => {
                let rtt = self.gaussian(self.center, *variance, rng);
                if rng.gen_bool(switch_prob.clamp(0.0, 1.0)) {
                    self.center = rtt;
                }
                rtt
            }
            ServerConfig::Volatile { variance, jump_prob, .. } => {
                let rtt = self.gaussian(self.center, *variance, rng);
                if rng.gen_bool(jump_prob.clamp(0.0, 1.0)) {
                    self.center = rng.gen_range(0..self.rtt_range);
                    info!(center = self.center, "volatile server jumped");
                }
                rtt
            }
            ServerConfig::Adversarial { sequence, rounds } => {
                let index = self.next_sequence_index(sequence.len(), *rounds);
                let center = sequence[index];
                if index != self.sequence_index {
                    info!(
                        index,
                        center,
                        calls = self.calls_count,
                        "adversarial server moved to next rtt"
                    );
                }
                self.sequence_index = index;
                self.calls_count += 1;
                self.center = center;
                self.gaussian(center, ADVERSARIAL_VARIANCE, rng)
            }
        }
    }

    fn delivered<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        match &self.config {
            ServerConfig::Unreliable { receive_prob, .. } => {
                rng.gen_bool(receive_prob.clamp(0.0, 1.0))
            }
            _ => true,
        }
    }

    fn reset(&mut self) {
        self.center = Self::initial_center(&self.config);
        self.calls_count = 0;
        self.sequence_index = 0;
    }
}
