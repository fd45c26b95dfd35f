//! Random linear-Gaussian network generator.
//!
//! Topologies are grown by a random walk over DAGs that starts from the chain
//! `0 → 1 → … → n-1`. Edges always point from the lower to the higher index,
//! so every intermediate graph is acyclic.
//!
//! - **Singly connected** (polytree): each step swaps one edge of the
//!   underlying tree for another, so the graph stays a spanning tree.
//! - **Multi connected**: each step toggles one edge, refusing removals that
//!   would disconnect the graph and additions past `max_parents`.

use lgbn_core::{validate, LinearGaussianNetwork, LinearGaussianNode};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use crate::error::GeneratorError;

/// Shape of the generated DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// At most one undirected path between any two nodes
    Singly,

    /// Undirected cycles allowed
    Multi,
}

impl Topology {
    pub fn name(&self) -> &'static str {
        match self {
            Topology::Singly => "singly",
            Topology::Multi => "multi",
        }
    }
}

impl std::str::FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s" | "singly" => Ok(Topology::Singly),
            "m" | "multi" => Ok(Topology::Multi),
            _ => Err(format!("Unknown topology: {} (expected 's' or 'm')", s)),
        }
    }
}

/// Configuration for [`generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Number of nodes (default: 2)
    pub nodes: usize,

    /// Random-walk steps over the topology (default: 10)
    pub max_iter: usize,

    /// In-degree cap for every node (default: 3)
    pub max_parents: usize,

    /// Magnitude range of regression weights; the sign is drawn separately
    pub weight_range: (f64, f64),

    /// Range of node intercepts
    pub intercept_range: (f64, f64),

    /// Range of node noise variances (must be strictly positive)
    pub variance_range: (f64, f64),
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            nodes: 2,
            max_iter: 10,
            max_parents: 3,
            weight_range: (0.5, 2.0),
            intercept_range: (-1.0, 1.0),
            variance_range: (0.5, 1.5),
        }
    }
}

impl GeneratorConfig {
    fn check(&self) -> Result<(), GeneratorError> {
        if self.nodes == 0 {
            return Err(GeneratorError::config("at least one node is required"));
        }
        if self.max_parents == 0 {
            return Err(GeneratorError::config("max_parents must be at least 1"));
        }
        for (name, (lo, hi)) in [
            ("weight_range", self.weight_range),
            ("intercept_range", self.intercept_range),
            ("variance_range", self.variance_range),
        ] {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(GeneratorError::config(format!(
                    "{} must be a finite (low, high) pair, got ({}, {})",
                    name, lo, hi
                )));
            }
        }
        if self.variance_range.0 <= 0.0 {
            return Err(GeneratorError::config("variance_range must be strictly positive"));
        }
        if self.weight_range.0 < 0.0 {
            return Err(GeneratorError::config("weight_range is a magnitude range"));
        }
        Ok(())
    }
}

/// Generates a random connected DAG with random linear-Gaussian parameters.
pub fn generate<R: Rng + ?Sized>(
    topology: Topology,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<LinearGaussianNetwork, GeneratorError> {
    config.check()?;
    let edges = random_topology(topology, config, rng);

    let mut nodes: Vec<LinearGaussianNode> = (0..config.nodes)
        .map(|i| {
            let intercept = draw(rng, config.intercept_range);
            let variance = draw(rng, config.variance_range);
            LinearGaussianNode::root(i, intercept, variance)
        })
        .collect();

    for &(parent, child) in &edges {
        let magnitude = draw(rng, config.weight_range);
        let weight = if rng.gen_bool(0.5) { magnitude } else { -magnitude };
        let node = &mut nodes[child];
        node.parents.push(parent);
        node.weights.push(weight);
    }

    Ok(LinearGaussianNetwork::new(nodes)?)
}

/// Edge set `(parent, child)` with `parent < child`.
pub fn random_topology<R: Rng + ?Sized>(
    topology: Topology,
    config: &GeneratorConfig,
    rng: &mut R,
) -> BTreeSet<(usize, usize)> {
    let n = config.nodes;
    let mut edges: BTreeSet<(usize, usize)> = (1..n).map(|i| (i - 1, i)).collect();
    if n < 2 {
        return edges;
    }

    for _ in 0..config.max_iter {
        let (u, v) = random_pair(n, rng);
        match topology {
            Topology::Singly => singly_step(&mut edges, n, u, v, config.max_parents, rng),
            Topology::Multi => multi_step(&mut edges, n, u, v, config.max_parents),
        }
    }
    edges
}

fn draw<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if lo == hi {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

/// Two distinct nodes, ordered.
fn random_pair<R: Rng + ?Sized>(n: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.gen_range(0..n);
    let mut b = rng.gen_range(0..n - 1);
    if b >= a {
        b += 1;
    }
    (a.min(b), a.max(b))
}

fn in_degree(edges: &BTreeSet<(usize, usize)>, node: usize) -> usize {
    edges.iter().filter(|&&(_, child)| child == node).count()
}

/// Replace one edge on the tree path `u … v` with `u → v`.
fn singly_step<R: Rng + ?Sized>(
    edges: &mut BTreeSet<(usize, usize)>,
    n: usize,
    u: usize,
    v: usize,
    max_parents: usize,
    rng: &mut R,
) {
    if edges.contains(&(u, v)) {
        return;
    }
    let Some(path) = undirected_path(edges, n, u, v) else {
        return;
    };

    let cut = rng.gen_range(0..path.len() - 1);
    let (a, b) = (path[cut], path[cut + 1]);
    let removed = (a.min(b), a.max(b));
    if removed.1 != v && in_degree(edges, v) >= max_parents {
        return;
    }

    edges.remove(&removed);
    edges.insert((u, v));
}

/// Toggle `u → v` while keeping the graph weakly connected.
fn multi_step(
    edges: &mut BTreeSet<(usize, usize)>,
    n: usize,
    u: usize,
    v: usize,
    max_parents: usize,
) {
    if edges.remove(&(u, v)) {
        let remaining: Vec<(usize, usize)> = edges.iter().copied().collect();
        if !validate(n, &remaining).is_weakly_connected {
            edges.insert((u, v));
        }
    } else if in_degree(edges, v) < max_parents {
        edges.insert((u, v));
    }
}

/// Node sequence from `from` to `to` ignoring edge direction (BFS).
fn undirected_path(
    edges: &BTreeSet<(usize, usize)>,
    n: usize,
    from: usize,
    to: usize,
) -> Option<Vec<usize>> {
    let mut neighbours = vec![Vec::new(); n];
    for &(a, b) in edges {
        neighbours[a].push(b);
        neighbours[b].push(a);
    }

    let mut prev = vec![usize::MAX; n];
    prev[from] = from;
    let mut queue = VecDeque::from([from]);
    while let Some(node) = queue.pop_front() {
        if node == to {
            break;
        }
        for &next in &neighbours[node] {
            if prev[next] == usize::MAX {
                prev[next] = node;
                queue.push_back(next);
            }
        }
    }
    if prev[to] == usize::MAX {
        return None;
    }

    let mut path = vec![to];
    let mut cur = to;
    while cur != from {
        cur = prev[cur];
        path.push(cur);
    }
    path.reverse();
    Some(path)
}
