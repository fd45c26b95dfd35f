//! Error types for inference and network construction.

use thiserror::Error;

/// Errors raised by [`GaussianConditioner`](crate::GaussianConditioner) and
/// the sample statistics helpers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// Mean/covariance shapes disagree, covariance is asymmetric, or the
    /// sample size is zero.
    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),

    /// Evidence indices or values are malformed.
    #[error("Invalid evidence: {0}")]
    InvalidEvidence(String),

    /// The evidence block of the prior covariance cannot be inverted.
    #[error("Singular evidence covariance for indices {indices:?} (min pivot {min_pivot:e})")]
    SingularCovariance {
        indices: Vec<usize>,
        min_pivot: f64,
    },
}

impl InferenceError {
    /// Creates an invalid-distribution error.
    pub fn distribution(msg: impl Into<String>) -> Self {
        Self::InvalidDistribution(msg.into())
    }

    /// Creates an invalid-evidence error.
    pub fn evidence(msg: impl Into<String>) -> Self {
        Self::InvalidEvidence(msg.into())
    }
}

/// Errors raised while building a [`LinearGaussianNetwork`](crate::LinearGaussianNetwork).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// A node references a parent that does not exist.
    #[error("Node {node} references unknown parent {parent}")]
    UnknownParent { node: usize, parent: usize },

    /// A node lists itself or the same parent twice.
    #[error("Node {node} has an invalid parent list: {reason}")]
    InvalidParents { node: usize, reason: String },

    /// A node's parameters are unusable.
    #[error("Node {node} has invalid parameters: {reason}")]
    InvalidParameters { node: usize, reason: String },

    /// The parent relation contains a directed cycle.
    #[error("Network contains a cycle through nodes {0:?}")]
    Cycle(Vec<usize>),
}

impl NetworkError {
    /// Creates an invalid-parameters error for `node`.
    pub fn parameters(node: usize, reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            node,
            reason: reason.into(),
        }
    }
}
