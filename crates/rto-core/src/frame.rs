//! Credit frames: weight deltas produced by one feedback or expiry event.
//!
//! A frame has the logical shape of the arm bank (`rtt_range x 2`) but only
//! ever touches one contiguous span per channel, so it is stored sparsely:
//!
//! ```text
//!  index:    0 ........ rto ..... rtt-P ... rtt ... rtt+P ........ range
//!  promote:                               [ 10/(1+|i-rtt|) ]
//!  demote:            [ |rtt-i|/range ]     (rtt > rto: timeout too small)
//!  demote:                                          [ |rtt-i|/range .... ]
//!                                                    (rtt <= rto: too generous)
//! ```
//!
//! Promotion and demotion regions of one frame are disjoint. Frames are
//! immutable once built.

use crate::config::LearnerConfig;

/// Contiguous run of weights starting at `start`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameSpan {
    start: usize,
    weights: Vec<f64>,
}

impl FrameSpan {
    fn from_range(range: std::ops::Range<usize>, weight: impl Fn(usize) -> f64) -> Self {
        Self {
            start: range.start,
            weights: range.map(weight).collect(),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last covered index.
    pub fn end(&self) -> usize {
        self.start + self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end()).contains(&index)
    }

    /// Weight at `index`, zero outside the span.
    pub fn weight(&self, index: usize) -> f64 {
        if self.contains(index) {
            self.weights[index - self.start]
        } else {
            0.0
        }
    }

    /// `(index, weight)` pairs in increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .map(move |(offset, &w)| (self.start + offset, w))
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Sparse weight-delta frame over the arm bank.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreditFrame {
    promote: FrameSpan,
    demote: FrameSpan,
}

impl CreditFrame {
    /// Frame with no contribution; used to pre-fill the window.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.promote.is_empty() && self.demote.is_empty()
    }

    /// Build the frame for a delivered feedback `(rto, rtt)`.
    ///
    /// Both values must already be checked against `config.rtt_range`.
    #[must_use]
    pub fn on_feedback(config: &LearnerConfig, rto: usize, rtt: usize) -> Self {
        let range = config.rtt_range;
        let spread = config.promotion_range;
        debug_assert!(rto < range, "rto {} outside range {}", rto, range);
        debug_assert!(rtt < range, "rtt {} outside range {}", rtt, range);

        let promote_start = rtt.saturating_sub(spread);
        let promote_end = rtt.saturating_add(spread).min(range);
        let base_promote = config.base_promote_weight;
        let promote = FrameSpan::from_range(promote_start..promote_end, |i| {
            base_promote / (1 + i.abs_diff(rtt)) as f64
        });

        let demote_range = if rtt <= rto {
            promote_end..range
        } else {
            rto..rto.max(rtt.saturating_sub(spread))
        };
        let base_demote = config.base_demote_weight;
        let demote = FrameSpan::from_range(demote_range, |i| {
            base_demote * i.abs_diff(rtt) as f64 / range as f64
        });

        Self { promote, demote }
    }

    /// Build the early-demotion frame for a timeout that expired unanswered.
    ///
    /// Every arm at or below `rto` is demoted, more strongly the further
    /// below it lies.
    #[must_use]
    pub fn on_expiry(config: &LearnerConfig, rto: usize) -> Self {
        debug_assert!(rto < config.rtt_range, "rto {} outside range", rto);

        let base_demote = config.base_demote_weight;
        Self {
            promote: FrameSpan::default(),
            demote: FrameSpan::from_range(0..rto + 1, |i| {
                base_demote * sigmoid(rto.abs_diff(i) as f64)
            }),
        }
    }

    /// Success-channel span.
    pub fn promote(&self) -> &FrameSpan {
        &self.promote
    }

    /// Failure-channel span.
    pub fn demote(&self) -> &FrameSpan {
        &self.demote
    }
}

/// Logistic function `1 / (1 + e^-x)`.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
