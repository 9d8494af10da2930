//! Node identity and position
//!
//! Nodes are identified by a small integer, as in a sensor field where
//! identifiers are assigned at deployment time. The sink's identity is
//! known a priori by every node.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifier of a node in the sensor field
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("{_0}")]
pub struct NodeId(pub u32);

impl NodeId {
    /// Conventional sink identity
    pub const SINK: NodeId = NodeId(0);

    /// Create a node id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Generate ids `0..count`
    pub fn range(count: u32) -> Vec<Self> {
        (0..count).map(Self).collect()
    }

    /// Get the raw identifier
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Planar position of a node
#[derive(Debug, Display, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[display("({x:.2}, {y:.2})")]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Create a position
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}
