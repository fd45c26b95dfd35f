//! LGBN Simulator - random linear-Gaussian networks and exact inference runs
//!
//! Generates a random DAG, draws data from it, estimates the joint Gaussian
//! prior, optionally conditions on evidence, and exports the result as JSON.
//!
//! # Usage
//!
//! ```ignore
//! use lgbn_sim::{run, RunConfig, Topology};
//!
//! let config = RunConfig {
//!     topology: Topology::Multi,
//!     evidence: vec![(1, 2.0)],
//!     ..Default::default()
//! };
//! let summary = run(&config)?;
//! ```

mod error;
pub mod generator;
pub mod runner;

pub use error::{GeneratorError, SimError};
pub use generator::{generate, GeneratorConfig, Topology};
pub use runner::{parse_evidence, run, RunConfig, RunSummary};
