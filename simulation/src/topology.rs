//! Sensor field deployments
//!
//! A [`Deployment`] places nodes on a plane and links every pair within
//! radio range (unit-disk connectivity). Builders cover the usual layouts:
//! - Line: nodes spaced evenly along the x axis
//! - Grid: rows and columns at a fixed spacing
//! - Random: uniform placement in a square, seeded
//! - Custom: explicit edge list, positions along a line

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use gradient_core::{NodeId, Position};

/// Node placement and connectivity
#[derive(Debug, Clone, Default)]
pub struct Deployment {
    positions: BTreeMap<NodeId, Position>,
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl Deployment {
    /// Create an empty deployment
    pub fn new() -> Self {
        Self::default()
    }

    /// Place nodes and link every pair within `range` of each other
    pub fn unit_disk(positions: impl IntoIterator<Item = (NodeId, Position)>, range: f64) -> Self {
        let mut deployment = Self::new();
        for (node, position) in positions {
            deployment.add_node(node, position);
        }

        let nodes: Vec<(NodeId, Position)> =
            deployment.positions.iter().map(|(n, p)| (*n, *p)).collect();
        for (i, (a, pa)) in nodes.iter().enumerate() {
            for (b, pb) in &nodes[i + 1..] {
                if pa.distance_to(pb) <= range {
                    deployment.connect(*a, *b);
                }
            }
        }
        deployment
    }

    /// Add a node, or move it if already placed
    pub fn add_node(&mut self, node: NodeId, position: Position) {
        self.positions.insert(node, position);
        self.adjacency.entry(node).or_default();
    }

    /// Add a bidirectional link
    ///
    /// Unplaced endpoints are added at the origin.
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return; // No self-loops
        }
        for node in [a, b] {
            self.positions.entry(node).or_default();
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }

    /// Nodes that hear a broadcast from `node`
    pub fn neighbors(&self, node: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.adjacency.get(&node)
    }

    /// Check if two nodes are within range of each other
    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(&a)
            .is_some_and(|neighbors| neighbors.contains(&b))
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.positions.contains_key(&node)
    }

    pub fn position(&self, node: NodeId) -> Option<Position> {
        self.positions.get(&node).copied()
    }

    /// All node ids, ascending
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.positions.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of links
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Hop distance from `root` to every node it can reach
    pub fn hop_distances(&self, root: NodeId) -> BTreeMap<NodeId, u32> {
        let mut distances = BTreeMap::new();
        if !self.contains(root) {
            return distances;
        }
        distances.insert(root, 0);
        let mut frontier = VecDeque::from([root]);

        while let Some(node) = frontier.pop_front() {
            let next = distances[&node] + 1;
            for neighbor in self.adjacency.get(&node).into_iter().flatten() {
                if !distances.contains_key(neighbor) {
                    distances.insert(*neighbor, next);
                    frontier.push_back(*neighbor);
                }
            }
        }
        distances
    }

    /// Whether every node can reach every other
    pub fn is_connected(&self) -> bool {
        match self.positions.keys().next() {
            Some(first) => self.hop_distances(*first).len() == self.node_count(),
            None => true,
        }
    }

    /// ASCII summary of nodes, positions and links
    pub fn visualize(&self) -> String {
        let mut output = String::new();
        output.push_str("Deployment:\n");
        output.push_str(&format!("  Nodes: {}\n", self.node_count()));
        output.push_str(&format!("  Links: {}\n\n", self.edge_count()));

        for (node, position) in &self.positions {
            let neighbors: Vec<String> = self
                .adjacency
                .get(node)
                .into_iter()
                .flatten()
                .map(|n| n.to_string())
                .collect();
            output.push_str(&format!(
                "  {:>3} {} -> [{}]\n",
                node,
                position,
                neighbors.join(", ")
            ));
        }
        output
    }
}

/// Builder for common deployments
///
/// Nodes are numbered from 0, so node 0 (the default sink) sits at one end
/// of a line or a corner of a grid.
#[derive(Debug, Clone)]
pub struct DeploymentBuilder {
    node_count: u32,
    spacing: f64,
    range: f64,
}

impl DeploymentBuilder {
    /// `node_count` nodes, 10 units apart, with a range reaching only the
    /// nearest neighbours
    pub fn new(node_count: u32) -> Self {
        Self {
            node_count,
            spacing: 10.0,
            range: 10.0,
        }
    }

    /// Distance between adjacent nodes in line and grid layouts
    pub fn spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    /// Radio range
    pub fn range(mut self, range: f64) -> Self {
        self.range = range;
        self
    }

    /// 0 - 1 - 2 - ... along the x axis
    pub fn line(self) -> Deployment {
        let spacing = self.spacing;
        let positions = NodeId::range(self.node_count)
            .into_iter()
            .map(|n| (n, Position::new(f64::from(n.as_u32()) * spacing, 0.0)));
        Deployment::unit_disk(positions, self.range)
    }

    /// Row-major grid with `columns` nodes per row
    pub fn grid(self, columns: u32) -> Deployment {
        let columns = columns.max(1);
        let spacing = self.spacing;
        let positions = NodeId::range(self.node_count).into_iter().map(|n| {
            let (row, col) = (n.as_u32() / columns, n.as_u32() % columns);
            (
                n,
                Position::new(f64::from(col) * spacing, f64::from(row) * spacing),
            )
        });
        Deployment::unit_disk(positions, self.range)
    }

    /// Uniform placement in a `side` x `side` square
    ///
    /// The same seed always yields the same field.
    pub fn random(self, side: f64, seed: u64) -> Deployment {
        let mut rng = StdRng::seed_from_u64(seed);
        let positions: Vec<(NodeId, Position)> = NodeId::range(self.node_count)
            .into_iter()
            .map(|n| {
                let x = rng.random_range(0.0..=side);
                let y = rng.random_range(0.0..=side);
                (n, Position::new(x, y))
            })
            .collect();
        Deployment::unit_disk(positions, self.range)
    }
}

/// Create a deployment from an edge list
///
/// Nodes are placed along the x axis by id; connectivity comes from the
/// edges alone.
pub fn from_edges(edges: &[(u32, u32)]) -> Deployment {
    let mut deployment = Deployment::new();
    for &(a, b) in edges {
        for id in [a, b] {
            deployment.add_node(NodeId(id), Position::new(f64::from(id) * 10.0, 0.0));
        }
        deployment.connect(NodeId(a), NodeId(b));
    }
    deployment
}
