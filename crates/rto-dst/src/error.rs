//! Errors raised while running simulated experiments.

use rto_core::RtoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("learner rejected feedback: {0}")]
    Learner(#[from] RtoError),

    #[error("invalid experiment configuration: {0}")]
    InvalidExperiment(&'static str),

    #[error("DST_SEED must be a valid u64, got {0:?}")]
    InvalidSeed(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
