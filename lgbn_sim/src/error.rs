//! Error types for generation and end-to-end runs.

use lgbn_core::{InferenceError, NetworkError};
use thiserror::Error;

/// Errors from the random topology generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Generator settings are unusable
    #[error("Invalid generator config: {0}")]
    InvalidConfig(String),

    /// The generated parameters did not form a valid network
    #[error("Generated network rejected: {0}")]
    Network(#[from] NetworkError),
}

impl GeneratorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Errors from a full generate → estimate → condition → export run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// Malformed `IDX=VALUE` evidence argument
    #[error("Invalid evidence argument '{0}'")]
    EvidenceArg(String),

    #[error("Export failed: {0}")]
    Io(#[from] std::io::Error),
}
