//! LGBN Core - Exact Inference over Linear-Gaussian Bayesian Networks
//!
//! The centre of this library is [`GaussianConditioner`], which conditions a
//! joint Gaussian prior on observed variables and exposes the result as
//! mean/covariance, correlation, or fresh samples. Around it:
//! 1. **Network model**: DAGs of linear-Gaussian nodes with exact joint moments
//! 2. **Statistics**: prior estimation from sampled data
//! 3. **Validation**: weak-connectivity checks for generated topologies
//! 4. **Export**: JSON documents of networks and inferred distributions

pub mod conditioner;
pub mod error;
pub mod export;
pub mod network;
pub mod statistics;
pub mod validation;

// Re-export key types for convenience
pub use conditioner::{ConditionerState, GaussianConditioner};
pub use error::{InferenceError, NetworkError};
pub use export::NetworkDocument;
pub use network::{LinearGaussianNetwork, LinearGaussianNode};
pub use validation::{validate, ConnectivityReport};
