//! End-to-end run: generate → validate → sample → estimate → condition → export.

use chrono::{DateTime, Local};
use lgbn_core::statistics::estimate_prior;
use lgbn_core::{validate, ConditionerState, ConnectivityReport, GaussianConditioner, NetworkDocument};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::generator::{generate, GeneratorConfig, Topology};

/// Configuration of a single run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub topology: Topology,
    pub generator: GeneratorConfig,

    /// Observations drawn to estimate the prior (default: 10000)
    pub samples: usize,

    /// Seed for topology, parameters and data
    pub seed: u64,

    /// `(index, value)` pairs to condition on after estimation
    pub evidence: Vec<(usize, f64)>,

    /// Output file; `None` picks a timestamped name in the working directory
    pub output: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            topology: Topology::Singly,
            generator: GeneratorConfig::default(),
            samples: 10_000,
            seed: 42,
            evidence: Vec::new(),
            output: None,
        }
    }
}

/// Outcome of [`run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub topology: Topology,
    pub seed: u64,
    pub validation: ConnectivityReport,
    pub state: ConditionerState,
    pub mean: Vec<f64>,
    pub output_path: PathBuf,
}

/// Runs the full pipeline and writes the JSON document.
pub fn run(config: &RunConfig) -> Result<RunSummary, SimError> {
    info!(
        "Generating {} network: {} nodes, {} iterations (seed={})",
        config.topology.name(),
        config.generator.nodes,
        config.generator.max_iter,
        config.seed
    );

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let network = generate(config.topology, &config.generator, &mut rng)?;

    let validation = validate(network.node_count(), &network.edges());
    if validation.ok {
        debug!("  {} edges, weakly connected", validation.edges);
    } else {
        warn!(
            "Generated topology failed validation: {} components, {} orphans",
            validation.num_components, validation.orphan_nodes
        );
    }

    let data = network.sample(config.samples, &mut rng);
    let (mean, covariance, sample_size) = estimate_prior(&data)?;
    debug!("  estimated prior from {} samples", sample_size);

    let mut conditioner = GaussianConditioner::new(mean, covariance, sample_size)?;
    if !config.evidence.is_empty() {
        let (indices, values): (Vec<usize>, Vec<f64>) = config.evidence.iter().copied().unzip();
        conditioner.update_mean_cov(&values, &indices)?;
        info!("Conditioned on {} evidence variables", indices.len());
    }

    let document = NetworkDocument::new(
        config.topology.name(),
        config.seed,
        &network,
        validation.clone(),
        &conditioner,
    );
    let output_path = config
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(config.topology, Local::now()));
    document.write_to_file(&output_path)?;
    info!("Network JSON written to {}", output_path.display());

    Ok(RunSummary {
        topology: config.topology,
        seed: config.seed,
        validation,
        state: conditioner.state(),
        mean: document.mean,
        output_path,
    })
}

/// `{singly|multi}_{YYYYmmdd_HHMMSS_micros}.json`
pub fn default_output_path(topology: Topology, now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!(
        "{}_{}.json",
        topology.name(),
        now.format("%Y%m%d_%H%M%S_%6f")
    ))
}

/// Parses an `IDX=VALUE` evidence argument.
pub fn parse_evidence(arg: &str) -> Result<(usize, f64), SimError> {
    let invalid = || SimError::EvidenceArg(arg.to_string());
    let (index, value) = arg.split_once('=').ok_or_else(invalid)?;
    let index = index.trim().parse::<usize>().map_err(|_| invalid())?;
    let value = value.trim().parse::<f64>().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok((index, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use lgbn_core::InferenceError;

    fn temp_output(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lgbn_sim_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_parse_evidence() {
        assert_eq!(parse_evidence("1=2.0").unwrap(), (1, 2.0));
        assert_eq!(parse_evidence(" 3 = -0.5 ").unwrap(), (3, -0.5));
        for bad in ["1", "x=2", "1=y", "-1=2", "1=NaN"] {
            assert!(matches!(parse_evidence(bad), Err(SimError::EvidenceArg(_))), "{}", bad);
        }
    }

    #[test]
    fn test_default_output_path() {
        let now = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let path = default_output_path(Topology::Multi, now);
        assert_eq!(path, PathBuf::from("multi_20240102_030405_000000.json"));
    }

    #[test]
    fn test_run_writes_document() {
        let output = temp_output("run");
        let config = RunConfig {
            generator: GeneratorConfig {
                nodes: 4,
                max_iter: 20,
                ..Default::default()
            },
            samples: 2_000,
            evidence: vec![(0, 1.5)],
            output: Some(output.clone()),
            ..Default::default()
        };

        let summary = run(&config).unwrap();
        assert!(summary.validation.ok);
        assert_eq!(summary.state, ConditionerState::ConditionedActive);
        assert_eq!(summary.mean.len(), 4);
        assert_abs_diff_eq!(summary.mean[0], 1.5, epsilon = 1e-12);

        let json = std::fs::read_to_string(&output).unwrap();
        let doc: NetworkDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc.topology, "singly");
        assert_eq!(doc.sample_size, 2_000);
        assert_eq!(doc.edges.len(), 3);
        assert_eq!(doc.covariance.len(), 4);
        assert_eq!(doc.correlation[0][0], 1.0);
        assert!(doc.covariance[0].iter().all(|&v| v == 0.0));
        std::fs::remove_file(&output).ok();
    }

    #[test]
    fn test_run_is_deterministic() {
        let out_a = temp_output("det_a");
        let out_b = temp_output("det_b");
        let base = RunConfig {
            topology: Topology::Multi,
            generator: GeneratorConfig {
                nodes: 5,
                max_iter: 30,
                ..Default::default()
            },
            samples: 500,
            seed: 7,
            ..Default::default()
        };
        let a = run(&RunConfig { output: Some(out_a.clone()), ..base.clone() }).unwrap();
        let b = run(&RunConfig { output: Some(out_b.clone()), ..base }).unwrap();
        assert_eq!(a.mean, b.mean);
        assert_eq!(a.state, ConditionerState::PriorActive);
        std::fs::remove_file(&out_a).ok();
        std::fs::remove_file(&out_b).ok();
    }

    #[test]
    fn test_run_rejects_bad_evidence() {
        let config = RunConfig {
            evidence: vec![(9, 1.0)],
            output: Some(temp_output("bad")),
            ..Default::default()
        };
        assert!(matches!(
            run(&config),
            Err(SimError::Inference(InferenceError::InvalidEvidence(_)))
        ));
    }

    #[test]
    fn test_run_needs_two_samples() {
        let config = RunConfig {
            samples: 1,
            output: Some(temp_output("short")),
            ..Default::default()
        };
        assert!(matches!(
            run(&config),
            Err(SimError::Inference(InferenceError::InvalidDistribution(_)))
        ));
    }
}
