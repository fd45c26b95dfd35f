//! JSON export of a generated network and its inferred distribution.
//!
//! Arrays are plain nested numbers; all metadata lives in sibling fields.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::conditioner::GaussianConditioner;
use crate::network::{LinearGaussianNetwork, LinearGaussianNode};
use crate::validation::ConnectivityReport;

/// One observed variable in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub index: usize,
    pub value: f64,
}

/// Network structure, connectivity report and current mean/covariance/correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDocument {
    /// Generator topology label ("singly" or "multi")
    pub topology: String,

    /// Seed the run was generated from
    pub seed: u64,

    pub nodes: Vec<LinearGaussianNode>,

    /// `[parent, child]` pairs
    pub edges: Vec<[usize; 2]>,

    pub validation: ConnectivityReport,

    /// Number of observations behind the estimated prior
    pub sample_size: usize,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub evidence: Vec<EvidenceEntry>,

    pub mean: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
    pub correlation: Vec<Vec<f64>>,
}

impl NetworkDocument {
    /// Snapshots `network` and the conditioner's current distribution.
    pub fn new(
        topology: &str,
        seed: u64,
        network: &LinearGaussianNetwork,
        validation: ConnectivityReport,
        conditioner: &GaussianConditioner,
    ) -> Self {
        Self {
            topology: topology.to_string(),
            seed,
            nodes: network.nodes().to_vec(),
            edges: network.edges().into_iter().map(|(p, c)| [p, c]).collect(),
            validation,
            sample_size: conditioner.sample_size(),
            evidence: conditioner
                .evidence()
                .iter()
                .map(|&(index, value)| EvidenceEntry { index, value })
                .collect(),
            mean: vector_to_vec(conditioner.mean()),
            covariance: matrix_to_rows(conditioner.covariance()),
            correlation: matrix_to_rows(&conditioner.correlation()),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json_pretty()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

pub fn vector_to_vec(v: &DVector<f64>) -> Vec<f64> {
    v.iter().copied().collect()
}

/// Row-major nested rows.
pub fn matrix_to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|row| row.iter().copied().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;

    fn document() -> NetworkDocument {
        let network = LinearGaussianNetwork::new(vec![
            LinearGaussianNode::root(0, 0.0, 1.0),
            LinearGaussianNode::root(1, 1.0, 1.0).with_parent(0, 2.0),
        ])
        .unwrap();
        let (mean, cov) = network.joint_distribution();
        let mut conditioner = GaussianConditioner::new(mean, cov, 50).unwrap();
        conditioner.update_mean_cov(&[3.0], &[1]).unwrap();
        let report = validate(network.node_count(), &network.edges());
        NetworkDocument::new("singly", 42, &network, report, &conditioner)
    }

    #[test]
    fn test_matrix_to_rows_is_row_major() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(
            matrix_to_rows(&m),
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]
        );
    }

    #[test]
    fn test_document_shapes() {
        let doc = document();
        assert_eq!(doc.edges, vec![[0, 1]]);
        assert_eq!(doc.mean.len(), 2);
        assert_eq!(doc.covariance.len(), 2);
        assert!(doc.correlation.iter().all(|row| row.len() == 2));
        assert_eq!(doc.evidence, vec![EvidenceEntry { index: 1, value: 3.0 }]);
        assert_eq!(doc.mean[1], 3.0);
    }

    #[test]
    fn test_json_fields() {
        let json = document().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["topology"], "singly");
        assert_eq!(value["seed"], 42);
        assert_eq!(value["validation"]["ok"], true);
        assert_eq!(value["nodes"][1]["parents"][0], 0);
        assert!(value["covariance"][0].is_array());
        assert!(value["validation"].get("reason").is_none());
    }
}
