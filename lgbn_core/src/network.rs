//! Linear-Gaussian Bayesian networks.
//!
//! Each node is a linear function of its parents plus independent Gaussian
//! noise:
//!
//! ```text
//! X_i = b_i + Σ_p w_ip · X_p + ε_i,    ε_i ~ N(0, σ_i²)
//! ```
//!
//! The joint distribution of such a network is multivariate normal and can
//! be computed exactly by walking the DAG in topological order.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::error::NetworkError;

/// A single continuous node and its conditional linear-Gaussian parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGaussianNode {
    /// Position of the node in the network (column index in samples)
    pub id: usize,

    /// Display name
    pub name: String,

    /// Parent node ids
    pub parents: Vec<usize>,

    /// Regression weight per parent (same order as `parents`)
    pub weights: Vec<f64>,

    /// Constant term b_i
    pub intercept: f64,

    /// Noise variance σ_i² (strictly positive)
    pub variance: f64,
}

impl LinearGaussianNode {
    /// Creates a root node `X ~ N(intercept, variance)`.
    pub fn root(id: usize, intercept: f64, variance: f64) -> Self {
        Self {
            id,
            name: format!("X{}", id),
            parents: Vec::new(),
            weights: Vec::new(),
            intercept,
            variance,
        }
    }

    /// Adds a parent with the given regression weight.
    pub fn with_parent(mut self, parent: usize, weight: f64) -> Self {
        self.parents.push(parent);
        self.weights.push(weight);
        self
    }

    /// Overrides the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A validated directed acyclic graph of linear-Gaussian nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearGaussianNetwork {
    nodes: Vec<LinearGaussianNode>,

    #[serde(skip)]
    order: Vec<usize>,
}

impl LinearGaussianNetwork {
    /// Builds a network, checking parents, parameters and acyclicity.
    ///
    /// Node ids are rewritten to their position in `nodes`.
    pub fn new(mut nodes: Vec<LinearGaussianNode>) -> Result<Self, NetworkError> {
        let n = nodes.len();
        for (idx, node) in nodes.iter_mut().enumerate() {
            node.id = idx;
            Self::check_node(node, n)?;
        }
        let order = topological_sort(&nodes)?;
        Ok(Self { nodes, order })
    }

    fn check_node(node: &LinearGaussianNode, n: usize) -> Result<(), NetworkError> {
        if node.parents.len() != node.weights.len() {
            return Err(NetworkError::parameters(
                node.id,
                format!(
                    "{} parents but {} weights",
                    node.parents.len(),
                    node.weights.len()
                ),
            ));
        }
        if !(node.variance.is_finite() && node.variance > 0.0) {
            return Err(NetworkError::parameters(
                node.id,
                format!("noise variance must be positive, got {}", node.variance),
            ));
        }
        if !node.intercept.is_finite() || node.weights.iter().any(|w| !w.is_finite()) {
            return Err(NetworkError::parameters(node.id, "non-finite coefficient"));
        }

        let mut seen = HashSet::with_capacity(node.parents.len());
        for &parent in &node.parents {
            if parent >= n {
                return Err(NetworkError::UnknownParent {
                    node: node.id,
                    parent,
                });
            }
            if parent == node.id {
                return Err(NetworkError::InvalidParents {
                    node: node.id,
                    reason: "node is its own parent".to_string(),
                });
            }
            if !seen.insert(parent) {
                return Err(NetworkError::InvalidParents {
                    node: node.id,
                    reason: format!("parent {} listed twice", parent),
                });
            }
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[LinearGaussianNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.parents.len()).sum()
    }

    /// All `(parent, child)` pairs.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.nodes
            .iter()
            .flat_map(|node| node.parents.iter().map(move |&p| (p, node.id)))
            .collect()
    }

    /// Node ids in topological order (ties broken by ascending id).
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Exact joint mean and covariance implied by the network.
    pub fn joint_distribution(&self) -> (DVector<f64>, DMatrix<f64>) {
        let n = self.nodes.len();
        let mut mean = DVector::zeros(n);
        let mut cov = DMatrix::zeros(n, n);

        for (pos, &i) in self.order.iter().enumerate() {
            let node = &self.nodes[i];
            mean[i] = node.intercept
                + node
                    .parents
                    .iter()
                    .zip(&node.weights)
                    .map(|(&p, &w)| w * mean[p])
                    .sum::<f64>();

            // Cov(i, j) = Σ_p w_ip Cov(p, j) for every earlier j
            for &j in &self.order[..pos] {
                let c: f64 = node
                    .parents
                    .iter()
                    .zip(&node.weights)
                    .map(|(&p, &w)| w * cov[(p, j)])
                    .sum();
                cov[(i, j)] = c;
                cov[(j, i)] = c;
            }

            let explained: f64 = node
                .parents
                .iter()
                .zip(&node.weights)
                .map(|(&p, &w)| w * cov[(p, i)])
                .sum();
            cov[(i, i)] = node.variance + explained;
        }

        (mean, cov)
    }

    /// Draws `count` ancestral samples (rows) over all nodes (columns).
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> DMatrix<f64> {
        let mut data = DMatrix::zeros(count, self.nodes.len());
        for row in 0..count {
            for &i in &self.order {
                let node = &self.nodes[i];
                let noise: f64 = rng.sample(StandardNormal);
                let value = node.intercept
                    + node
                        .parents
                        .iter()
                        .zip(&node.weights)
                        .map(|(&p, &w)| w * data[(row, p)])
                        .sum::<f64>()
                    + node.variance.sqrt() * noise;
                data[(row, i)] = value;
            }
        }
        data
    }
}

/// Kahn's algorithm with a sorted frontier so the order is deterministic.
fn topological_sort(nodes: &[LinearGaussianNode]) -> Result<Vec<usize>, NetworkError> {
    let n = nodes.len();
    let mut in_degree: Vec<usize> = nodes.iter().map(|node| node.parents.len()).collect();
    let mut children = vec![Vec::new(); n];
    for node in nodes {
        for &p in &node.parents {
            children[p].push(node.id);
        }
    }

    let mut frontier: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(next) = frontier.pop_first() {
        order.push(next);
        for &child in &children[next] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                frontier.insert(child);
            }
        }
    }

    if order.len() != n {
        let stuck = (0..n).filter(|&i| in_degree[i] > 0).collect();
        return Err(NetworkError::Cycle(stuck));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::estimate_prior;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// X -> Y -> Z with X ~ N(0,1), Y|X ~ N(1+2X,1), Z|Y ~ N(1+2Y,1).
    fn serial_chain() -> LinearGaussianNetwork {
        LinearGaussianNetwork::new(vec![
            LinearGaussianNode::root(0, 0.0, 1.0).named("X"),
            LinearGaussianNode::root(1, 1.0, 1.0).with_parent(0, 2.0).named("Y"),
            LinearGaussianNode::root(2, 1.0, 1.0).with_parent(1, 2.0).named("Z"),
        ])
        .unwrap()
    }

    #[test]
    fn test_serial_chain_joint() {
        let (mean, cov) = serial_chain().joint_distribution();

        assert_relative_eq!(mean[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(mean[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(mean[2], 3.0, epsilon = 1e-12);

        let expected = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 2.0, 4.0, 2.0, 5.0, 10.0, 4.0, 10.0, 21.0],
        );
        assert_relative_eq!(cov, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_v_structure_joint() {
        // A -> C <- B, independent roots
        let net = LinearGaussianNetwork::new(vec![
            LinearGaussianNode::root(0, 1.0, 2.0),
            LinearGaussianNode::root(1, -1.0, 3.0),
            LinearGaussianNode::root(2, 0.5, 1.0)
                .with_parent(0, 1.0)
                .with_parent(1, -2.0),
        ])
        .unwrap();
        let (mean, cov) = net.joint_distribution();

        assert_relative_eq!(mean[2], 0.5 + 1.0 + 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(0, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(0, 2)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 2)], -6.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(2, 2)], 1.0 + 2.0 + 4.0 * 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_topological_order_handles_reversed_ids() {
        // 2 -> 1 -> 0
        let net = LinearGaussianNetwork::new(vec![
            LinearGaussianNode::root(0, 0.0, 1.0).with_parent(1, 1.0),
            LinearGaussianNode::root(1, 0.0, 1.0).with_parent(2, 1.0),
            LinearGaussianNode::root(2, 0.0, 1.0),
        ])
        .unwrap();
        assert_eq!(net.topological_order(), &[2, 1, 0]);
        assert_eq!(net.edges(), vec![(1, 0), (2, 1)]);
        assert_eq!(net.edge_count(), 2);

        let (_, cov) = net.joint_distribution();
        assert_relative_eq!(cov[(0, 0)], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cycle_rejected() {
        let result = LinearGaussianNetwork::new(vec![
            LinearGaussianNode::root(0, 0.0, 1.0).with_parent(1, 1.0),
            LinearGaussianNode::root(1, 0.0, 1.0).with_parent(0, 1.0),
        ]);
        assert!(matches!(result, Err(NetworkError::Cycle(_))));
    }

    #[test]
    fn test_invalid_nodes_rejected() {
        let unknown = LinearGaussianNetwork::new(vec![
            LinearGaussianNode::root(0, 0.0, 1.0).with_parent(5, 1.0),
        ]);
        assert!(matches!(
            unknown,
            Err(NetworkError::UnknownParent { node: 0, parent: 5 })
        ));

        let self_loop = LinearGaussianNetwork::new(vec![
            LinearGaussianNode::root(0, 0.0, 1.0).with_parent(0, 1.0),
        ]);
        assert!(matches!(self_loop, Err(NetworkError::InvalidParents { .. })));

        let zero_variance =
            LinearGaussianNetwork::new(vec![LinearGaussianNode::root(0, 0.0, 0.0)]);
        assert!(matches!(
            zero_variance,
            Err(NetworkError::InvalidParameters { .. })
        ));

        let mut mismatched = LinearGaussianNode::root(1, 0.0, 1.0).with_parent(0, 1.0);
        mismatched.weights.push(3.0);
        let result = LinearGaussianNetwork::new(vec![
            LinearGaussianNode::root(0, 0.0, 1.0),
            mismatched,
        ]);
        assert!(matches!(result, Err(NetworkError::InvalidParameters { node: 1, .. })));
    }

    #[test]
    fn test_ancestral_samples_match_joint() {
        let net = serial_chain();
        let mut rng = ChaCha8Rng::seed_from_u64(37);
        let data = net.sample(20_000, &mut rng);
        assert_eq!(data.shape(), (20_000, 3));

        let (mean, cov, _) = estimate_prior(&data).unwrap();
        let (true_mean, true_cov) = net.joint_distribution();
        for i in 0..3 {
            assert!((mean[i] - true_mean[i]).abs() < 0.15, "mean[{}] = {}", i, mean[i]);
            for j in 0..3 {
                let rel = (cov[(i, j)] - true_cov[(i, j)]).abs() / true_cov[(i, j)].abs();
                assert!(rel < 0.05, "cov[{},{}] = {}", i, j, cov[(i, j)]);
            }
        }
    }
}
