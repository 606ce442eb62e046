//! Graph builder: folds behavioral signals into the journey graph.
//!
//! One signal becomes one atomic graph mutation. Validation happens before
//! any state is touched, so a rejected signal leaves the graph (and its
//! generation counter) unchanged.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::store::JourneyGraph;
use crate::types::{NodeId, Session, SessionState, Signal};

/// Fallback outcome id for bounces that carry no outcome field.
const DEFAULT_BOUNCE_OUTCOME: &str = "bounce";

/// Error type for signal ingestion.
///
/// Ingestion errors are local and non-fatal: the signal is dropped, the
/// graph is unchanged, and the caller decides whether to log the loss.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    /// The signal carries no session id.
    #[error("signal has an empty session id")]
    MissingSessionId,
    /// A required id field is empty.
    #[error("signal field `{0}` is empty")]
    EmptyField(&'static str),
    /// Conversion value is not a finite non-negative number.
    #[error("conversion value {0} is not a finite non-negative number")]
    InvalidValue(String),
    /// A terminal signal referenced a session with no recorded visits.
    #[error("session not found: {0}")]
    UnknownSession(String),
    /// The session already has a terminal outcome recorded.
    #[error("session already closed: {0}")]
    SessionClosed(String),
}

/// Translates signals into journey-graph mutations.
///
/// Owns the single-writer discipline: `process_signal` and `clear` take the
/// write lock, so a Visit and a Conversion for the same session can never
/// interleave and corrupt path state. Readers (the query engine) share the
/// same graph handle and take the read lock.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    graph: Arc<RwLock<JourneyGraph>>,
}

impl GraphBuilder {
    /// Create a builder over a fresh empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the underlying graph, shared with the query engine.
    pub fn graph(&self) -> &Arc<RwLock<JourneyGraph>> {
        &self.graph
    }

    /// Apply one signal to the graph.
    ///
    /// All-or-nothing: on `Err` the graph is unchanged and the generation
    /// counter is not bumped. On `Ok` the generation advanced exactly once.
    pub fn process_signal(&self, signal: &Signal) -> Result<(), SignalError> {
        validate(signal)?;

        match signal {
            Signal::Visit {
                session_id,
                intent,
                content_id,
                ..
            } => self.apply_visit(session_id, intent, content_id),
            Signal::Conversion {
                session_id,
                outcome,
                value,
                ..
            } => self.apply_terminal(session_id, outcome, Some(*value)),
            Signal::Bounce {
                session_id,
                outcome,
                ..
            } => self.apply_terminal(
                session_id,
                outcome.as_deref().unwrap_or(DEFAULT_BOUNCE_OUTCOME),
                None,
            ),
        }
    }

    /// Reset the graph to empty, bumping the generation counter.
    pub fn clear(&self) {
        let mut graph = self.graph.write();
        graph.clear();
        debug!(generation = graph.generation(), "journey graph cleared");
    }

    fn apply_visit(
        &self,
        session_id: &str,
        intent: &str,
        content_id: &str,
    ) -> Result<(), SignalError> {
        let mut graph = self.graph.write();

        // Reject before mutating anything
        let prior_last = match graph.session(session_id) {
            Some(session) if !session.is_open() => {
                return Err(SignalError::SessionClosed(session_id.to_string()));
            }
            Some(session) => match session.last_node() {
                Some(last) => Some(last.clone()),
                // A stored session always has at least its root intent node
                None => return Err(SignalError::UnknownSession(session_id.to_string())),
            },
            None => None,
        };

        let intent_node = graph.touch_node(NodeId::intent(intent));
        let content_node = graph.touch_node(NodeId::content(content_id));

        match prior_last {
            // Extend the existing path from its last node
            Some(last) => {
                graph.record_traversal(last, content_node.clone(), None);
                if let Some(session) = graph.session_mut(session_id) {
                    session.path.push(content_node);
                    session.intents.insert(intent.to_string());
                }
            }
            // New session: the intent node is the path root; the implicit
            // virtual entry predecessor is not stored
            None => {
                let mut session = Session::open(session_id, intent_node.clone());
                graph.record_traversal(intent_node, content_node.clone(), None);
                session.path.push(content_node);
                graph.insert_session(session);
            }
        }

        graph.bump_generation();
        debug!(
            session = session_id,
            intent,
            content = content_id,
            generation = graph.generation(),
            "visit applied"
        );
        Ok(())
    }

    fn apply_terminal(
        &self,
        session_id: &str,
        outcome: &str,
        value: Option<f64>,
    ) -> Result<(), SignalError> {
        let mut graph = self.graph.write();

        let last = match graph.session(session_id) {
            None => return Err(SignalError::UnknownSession(session_id.to_string())),
            Some(session) if !session.is_open() => {
                return Err(SignalError::SessionClosed(session_id.to_string()));
            }
            Some(session) => match session.last_node() {
                Some(last) => last.clone(),
                None => return Err(SignalError::UnknownSession(session_id.to_string())),
            },
        };

        let outcome_node = graph.touch_node(NodeId::outcome(outcome));
        graph.record_traversal(last, outcome_node.clone(), value);

        if let Some(session) = graph.session_mut(session_id) {
            session.state = match value {
                Some(value) => SessionState::Converted {
                    outcome: outcome_node,
                    value,
                },
                None => SessionState::Bounced { outcome: outcome_node },
            };
        }

        graph.bump_generation();
        debug!(
            session = session_id,
            outcome,
            value,
            generation = graph.generation(),
            "session closed"
        );
        Ok(())
    }
}

fn validate(signal: &Signal) -> Result<(), SignalError> {
    if signal.session_id().is_empty() {
        return Err(SignalError::MissingSessionId);
    }

    match signal {
        Signal::Visit { intent, content_id, .. } => {
            if intent.is_empty() {
                return Err(SignalError::EmptyField("intent"));
            }
            if content_id.is_empty() {
                return Err(SignalError::EmptyField("contentId"));
            }
        }
        Signal::Conversion { outcome, value, .. } => {
            if outcome.is_empty() {
                return Err(SignalError::EmptyField("outcome"));
            }
            if !value.is_finite() || *value < 0.0 {
                return Err(SignalError::InvalidValue(value.to_string()));
            }
        }
        Signal::Bounce { outcome, .. } => {
            if let Some(outcome) = outcome {
                if outcome.is_empty() {
                    return Err(SignalError::EmptyField("outcome"));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeKey;

    fn visit(session: &str, intent: &str, content: &str) -> Signal {
        Signal::Visit {
            session_id: session.to_string(),
            intent: intent.to_string(),
            source: "organic".to_string(),
            content_id: content.to_string(),
            timestamp: 1_710_000_000_000,
        }
    }

    fn conversion(session: &str, outcome: &str, value: f64) -> Signal {
        Signal::Conversion {
            session_id: session.to_string(),
            outcome: outcome.to_string(),
            value,
            timestamp: 1_710_000_000_001,
        }
    }

    fn bounce(session: &str) -> Signal {
        Signal::Bounce {
            session_id: session.to_string(),
            outcome: None,
            timestamp: 1_710_000_000_001,
        }
    }

    #[test]
    fn test_first_visit_opens_session() {
        let builder = GraphBuilder::new();
        builder.process_signal(&visit("s1", "search", "paris")).unwrap();

        let graph = builder.graph().read();
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.num_sessions(), 1);
        assert_eq!(graph.generation(), 1);

        let session = graph.session("s1").unwrap();
        assert!(session.is_open());
        assert_eq!(session.path.len(), 2);

        let edge = EdgeKey::new(NodeId::intent("search"), NodeId::content("paris"));
        assert_eq!(graph.edge(&edge).unwrap().count, 1);
    }

    #[test]
    fn test_later_visits_extend_from_last_node() {
        let builder = GraphBuilder::new();
        builder.process_signal(&visit("s1", "search", "paris")).unwrap();
        builder.process_signal(&visit("s1", "search", "hotels")).unwrap();

        let graph = builder.graph().read();
        let edge = EdgeKey::new(NodeId::content("paris"), NodeId::content("hotels"));
        assert_eq!(graph.edge(&edge).unwrap().count, 1);
        assert_eq!(graph.session("s1").unwrap().path.len(), 3);
        assert_eq!(graph.generation(), 2);
    }

    #[test]
    fn test_conversion_closes_and_accumulates_value() {
        let builder = GraphBuilder::new();
        builder.process_signal(&visit("s1", "search", "paris")).unwrap();
        builder.process_signal(&conversion("s1", "booking", 120.0)).unwrap();

        let graph = builder.graph().read();
        let session = graph.session("s1").unwrap();
        assert!(!session.is_open());
        assert_eq!(session.conversion_value(), Some(120.0));

        let edge = EdgeKey::new(NodeId::content("paris"), NodeId::outcome("booking"));
        let stats = graph.edge(&edge).unwrap();
        assert_eq!(stats.count, 1);
        assert!((stats.value_sum - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bounce_uses_default_outcome() {
        let builder = GraphBuilder::new();
        builder.process_signal(&visit("s1", "browse", "rome")).unwrap();
        builder.process_signal(&bounce("s1")).unwrap();

        let graph = builder.graph().read();
        let session = graph.session("s1").unwrap();
        assert!(session.bounced());
        assert_eq!(session.outcome(), Some(&NodeId::outcome("bounce")));
    }

    #[test]
    fn test_malformed_signal_leaves_graph_unchanged() {
        let builder = GraphBuilder::new();

        let err = builder.process_signal(&visit("", "search", "paris")).unwrap_err();
        assert_eq!(err, SignalError::MissingSessionId);

        let err = builder.process_signal(&visit("s1", "", "paris")).unwrap_err();
        assert_eq!(err, SignalError::EmptyField("intent"));

        let err = builder
            .process_signal(&conversion("s1", "booking", f64::NAN))
            .unwrap_err();
        assert!(matches!(err, SignalError::InvalidValue(_)));

        let graph = builder.graph().read();
        assert_eq!(graph.num_nodes(), 0);
        assert_eq!(graph.num_sessions(), 0);
        assert_eq!(graph.generation(), 0);
    }

    #[test]
    fn test_terminal_for_unknown_session_rejected() {
        let builder = GraphBuilder::new();
        let err = builder.process_signal(&bounce("ghost")).unwrap_err();
        assert_eq!(err, SignalError::UnknownSession("ghost".to_string()));
        assert_eq!(builder.graph().read().generation(), 0);
    }

    #[test]
    fn test_signals_after_close_rejected() {
        let builder = GraphBuilder::new();
        builder.process_signal(&visit("s1", "search", "paris")).unwrap();
        builder.process_signal(&bounce("s1")).unwrap();

        let generation = builder.graph().read().generation();

        let err = builder.process_signal(&visit("s1", "search", "rome")).unwrap_err();
        assert_eq!(err, SignalError::SessionClosed("s1".to_string()));

        let err = builder.process_signal(&conversion("s1", "booking", 10.0)).unwrap_err();
        assert_eq!(err, SignalError::SessionClosed("s1".to_string()));

        // Rejections never advance the generation
        assert_eq!(builder.graph().read().generation(), generation);
    }

    #[test]
    fn test_mid_session_intent_recorded_not_routed() {
        let builder = GraphBuilder::new();
        builder.process_signal(&visit("s1", "search", "paris")).unwrap();
        builder.process_signal(&visit("s1", "browse", "rome")).unwrap();

        let graph = builder.graph().read();
        let session = graph.session("s1").unwrap();
        assert!(session.declared_intent("search"));
        assert!(session.declared_intent("browse"));

        // The path routes content-to-content; the second intent node exists
        // but is not on this session's path
        let edge = EdgeKey::new(NodeId::content("paris"), NodeId::content("rome"));
        assert_eq!(graph.edge(&edge).unwrap().count, 1);
        assert!(!session.path.contains(&NodeId::intent("browse")));
        assert!(graph.nodes().any(|n| n == &NodeId::intent("browse")));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let builder = GraphBuilder::new();
        builder.process_signal(&visit("s1", "search", "paris")).unwrap();

        builder.clear();
        {
            let graph = builder.graph().read();
            assert_eq!(graph.num_sessions(), 0);
            assert_eq!(graph.generation(), 2);
        }

        builder.clear();
        assert_eq!(builder.graph().read().generation(), 3);
    }
}
