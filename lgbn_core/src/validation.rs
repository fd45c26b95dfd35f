//! Connectivity validation for generated network topologies.
//!
//! A usable network is one weakly connected component: ignoring edge
//! direction every node can reach every other node, and no node is left as
//! an isolated orphan.

use serde::{Deserialize, Serialize};

// =============================================================================
// CONNECTIVITY REPORT
// =============================================================================

/// Summary of the weak-connectivity check for a DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    pub ok: bool,
    pub nodes: usize,
    pub edges: usize,
    pub is_weakly_connected: bool,
    pub num_components: usize,
    pub orphan_nodes: usize,

    /// Set only when the graph could not be analysed (e.g. it is empty)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Checks weak connectivity of a graph with `node_count` nodes.
///
/// Edges are `(parent, child)` pairs; endpoints outside `0..node_count` are
/// ignored.
pub fn validate(node_count: usize, edges: &[(usize, usize)]) -> ConnectivityReport {
    if node_count == 0 {
        return ConnectivityReport {
            ok: false,
            nodes: 0,
            edges: edges.len(),
            is_weakly_connected: false,
            num_components: 0,
            orphan_nodes: 0,
            reason: Some("empty graph".to_string()),
        };
    }

    let mut sets = DisjointSet::new(node_count);
    for &(a, b) in edges {
        if a < node_count && b < node_count {
            sets.union(a, b);
        }
    }

    let num_components = sets.component_count();
    let is_weakly_connected = num_components == 1;
    let orphan_nodes = if node_count > 1 {
        (0..node_count).filter(|&i| sets.component_size(i) == 1).count()
    } else {
        0
    };

    ConnectivityReport {
        ok: is_weakly_connected && orphan_nodes == 0,
        nodes: node_count,
        edges: edges.len(),
        is_weakly_connected,
        num_components,
        orphan_nodes,
        reason: None,
    }
}

// =============================================================================
// DISJOINT SET
// =============================================================================

/// Union-find with path compression and union by rank.
#[derive(Debug, Clone)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
    size: Vec<usize>,
    components: usize,
}

impl DisjointSet {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            size: vec![1; n],
            components: n,
        }
    }

    pub(crate) fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    /// Returns `false` when `x` and `y` were already joined.
    pub(crate) fn union(&mut self, x: usize, y: usize) -> bool {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return false;
        }

        let (big, small) = match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Less => (root_y, root_x),
            std::cmp::Ordering::Greater => (root_x, root_y),
            std::cmp::Ordering::Equal => {
                self.rank[root_x] += 1;
                (root_x, root_y)
            }
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        self.components -= 1;
        true
    }

    pub(crate) fn component_count(&self) -> usize {
        self.components
    }

    pub(crate) fn component_size(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.size[root]
    }
}
