//! Node types for the journey graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of node in the journey graph.
///
/// Ordering is part of the public contract: `Intent < Content < Outcome`,
/// so mixed-kind node listings sort intents first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A declared visitor goal (e.g. "search", "browse").
    Intent,
    /// A piece of content visited (page, article, hotel listing).
    Content,
    /// A terminal result: a conversion type or a bounce.
    Outcome,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intent => write!(f, "intent"),
            Self::Content => write!(f, "content"),
            Self::Outcome => write!(f, "outcome"),
        }
    }
}

/// Identity of a node in the journey graph.
///
/// Node identity is the pair `(kind, id)`: the intent "search" and a piece
/// of content with the id "search" are distinct nodes. Implements `Ord`
/// (kind, then id) for deterministic iteration and stable tie-breaks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Kind of the node.
    pub kind: NodeKind,
    /// Caller-supplied identifier, unique within the kind.
    pub id: String,
}

impl NodeId {
    /// Create a node id of an arbitrary kind.
    pub fn new(kind: NodeKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    /// Create an Intent node id.
    pub fn intent(id: impl Into<String>) -> Self {
        Self::new(NodeKind::Intent, id)
    }

    /// Create a Content node id.
    pub fn content(id: impl Into<String>) -> Self {
        Self::new(NodeKind::Content, id)
    }

    /// Create an Outcome node id.
    pub fn outcome(id: impl Into<String>) -> Self {
        Self::new(NodeKind::Outcome, id)
    }

    /// Render the node as a `kind:id` label for query rows.
    pub fn label(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
