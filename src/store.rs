//! In-memory journey graph store.
//!
//! Storage and mutation primitives only: signal semantics live in the
//! [builder](crate::builder), derived statistics in the
//! [scorer](crate::scorer).

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{EdgeKey, EdgeStats, NodeId, NodeKind, Session};

/// The directed multigraph of intents, content, and outcomes.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order. Nodes, edges,
/// and sessions are created by the builder on signal ingestion and destroyed
/// only by [`clear`](Self::clear).
///
/// The generation counter is the cache-invalidation backbone: it increases
/// on every mutating call, and scorer cache keys are generation-qualified,
/// so a mutation invalidates all previously cached scores without touching
/// the cache itself.
#[derive(Debug, Clone, Default)]
pub struct JourneyGraph {
    /// All nodes, keyed by (kind, id).
    nodes: BTreeSet<NodeId>,
    /// Weighted edges, keyed by (from, to).
    edges: BTreeMap<EdgeKey, EdgeStats>,
    /// Sessions by id.
    sessions: BTreeMap<String, Session>,
    /// Monotonically increasing mutation counter.
    generation: u64,
}

impl JourneyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation. Increases on every mutating call.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bump the generation counter by one.
    pub fn bump_generation(&mut self) {
        self.generation += 1;
    }

    /// Resolve-or-create a node. Returns the id for chaining.
    pub fn touch_node(&mut self, node: NodeId) -> NodeId {
        self.nodes.insert(node.clone());
        node
    }

    /// Record one traversal of the edge `(from, to)`, attributing `value`
    /// when the traversal ends at a Conversion outcome.
    pub fn record_traversal(&mut self, from: NodeId, to: NodeId, value: Option<f64>) {
        self.edges
            .entry(EdgeKey::new(from, to))
            .or_default()
            .record(value);
    }

    /// Insert a new session. The builder checks for an existing session
    /// before calling this.
    pub fn insert_session(&mut self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    /// Look up a session by id.
    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Mutable session lookup, used by the builder to extend paths.
    pub fn session_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Reset nodes, edges, and sessions to empty and bump the generation.
    ///
    /// Idempotent: clearing an already-empty graph is a no-op other than
    /// the generation increment.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.sessions.clear();
        self.generation += 1;
    }

    /// All nodes in canonical order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// Nodes of one kind, in canonical order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// All edges in canonical order.
    pub fn edges(&self) -> impl Iterator<Item = (&EdgeKey, &EdgeStats)> {
        self.edges.iter()
    }

    /// Stats for one edge.
    pub fn edge(&self, key: &EdgeKey) -> Option<&EdgeStats> {
        self.edges.get(key)
    }

    /// All sessions in id order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of sessions.
    pub fn num_sessions(&self) -> usize {
        self.sessions.len()
    }
}
