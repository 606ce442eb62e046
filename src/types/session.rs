//! Per-session path state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::edge::EdgeKey;
use super::node::NodeId;

/// Terminal state of a session.
///
/// State machine: `Open --(Visit)--> Open`, `Open --(Conversion)--> Converted`,
/// `Open --(Bounce)--> Bounced`. Closed states have no further transition;
/// the builder rejects signals for closed sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionState {
    /// One or more visits, no terminal signal yet.
    Open,
    /// Closed by a conversion carrying an attributed value.
    Converted {
        /// The Outcome node the session terminated at.
        outcome: NodeId,
        /// Value attributed to the conversion.
        value: f64,
    },
    /// Closed by a bounce.
    Bounced {
        /// The Outcome node the session terminated at.
        outcome: NodeId,
    },
}

/// The per-visitor unit of journey tracking.
///
/// Holds the ordered node path the session traced through the graph, the
/// set of intents its visits declared, and its terminal state. Created by
/// the builder on a session's first visit; destroyed only by `clear()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Caller-supplied session identifier.
    pub id: String,
    /// Ordered node references visited, starting at the first Intent node.
    pub path: Vec<NodeId>,
    /// Intents declared by this session's visits.
    pub intents: BTreeSet<String>,
    /// Terminal state.
    pub state: SessionState,
}

impl Session {
    /// Create a new open session rooted at its first intent.
    pub fn open(id: impl Into<String>, intent_node: NodeId) -> Self {
        let mut intents = BTreeSet::new();
        intents.insert(intent_node.id.clone());
        Self {
            id: id.into(),
            path: vec![intent_node],
            intents,
            state: SessionState::Open,
        }
    }

    /// Whether the session is still open.
    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open)
    }

    /// Whether the session terminated in a bounce.
    pub fn bounced(&self) -> bool {
        matches!(self.state, SessionState::Bounced { .. })
    }

    /// The conversion value, when the session converted.
    pub fn conversion_value(&self) -> Option<f64> {
        match &self.state {
            SessionState::Converted { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// The terminal Outcome node, when the session is closed.
    pub fn outcome(&self) -> Option<&NodeId> {
        match &self.state {
            SessionState::Open => None,
            SessionState::Converted { outcome, .. } => Some(outcome),
            SessionState::Bounced { outcome } => Some(outcome),
        }
    }

    /// Last node on the path.
    pub fn last_node(&self) -> Option<&NodeId> {
        self.path.last()
    }

    /// Whether this session declared the given intent in any of its visits.
    pub fn declared_intent(&self, intent: &str) -> bool {
        self.intents.contains(intent)
    }

    /// The full journey: the visited path plus the terminal Outcome node.
    ///
    /// `None` while the session is open; journeys are only defined for
    /// closed sessions.
    pub fn journey(&self) -> Option<Vec<NodeId>> {
        let outcome = self.outcome()?;
        let mut journey = self.path.clone();
        journey.push(outcome.clone());
        Some(journey)
    }

    /// Edges this session traversed, in order, terminal edge included.
    ///
    /// For an open session this is the consecutive pairs of `path`; for a
    /// closed session the edge into the Outcome node is appended.
    pub fn traversed_edges(&self) -> Vec<EdgeKey> {
        let mut edges: Vec<EdgeKey> = self
            .path
            .windows(2)
            .map(|w| EdgeKey::new(w[0].clone(), w[1].clone()))
            .collect();

        if let (Some(last), Some(outcome)) = (self.path.last(), self.outcome()) {
            edges.push(EdgeKey::new(last.clone(), outcome.clone()));
        }

        edges
    }

    /// Whether this session traversed the given edge, terminal edge included.
    pub fn traversed(&self, edge: &EdgeKey) -> bool {
        self.traversed_edges().iter().any(|e| e == edge)
    }

    /// The last Content node visited before termination, if any.
    pub fn last_content_node(&self) -> Option<&NodeId> {
        self.path
            .iter()
            .rev()
            .find(|n| n.kind == super::node::NodeKind::Content)
    }
}
