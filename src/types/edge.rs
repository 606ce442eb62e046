//! Edge types for the journey graph.

use serde::{Deserialize, Serialize};
use super::node::NodeId;

/// Key of a directed edge in the journey graph.
///
/// Edges are keyed by `(from, to)`; the derived `Ord` is the canonical
/// ordering (from, then to) used everywhere results must be deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Source node.
    pub from: NodeId,
    /// Target node.
    pub to: NodeId,
}

impl EdgeKey {
    /// Create a new edge key.
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Accumulated weights of an edge.
///
/// Both fields only increase between `clear()` calls: `count` by one per
/// session traversal, `value_sum` by the conversion value when the traversal
/// ends at a Conversion outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeStats {
    /// Number of session traversals of this edge.
    pub count: u64,
    /// Conversion value accumulated on this edge.
    pub value_sum: f64,
}

impl EdgeStats {
    /// Record one traversal, attributing `value` when present.
    pub fn record(&mut self, value: Option<f64>) {
        self.count += 1;
        if let Some(v) = value {
            self.value_sum += v;
        }
    }
}
