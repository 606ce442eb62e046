//! # journey-kernel
//!
//! In-memory intent/journey graph analytics over behavioral signals.
//!
//! The engine answers one question:
//!
//! > Given the visits, conversions, and bounces observed so far, where do
//! > visitor journeys succeed and where do they break?
//!
//! ## Core Contract
//!
//! 1. Fold each behavioral signal into a directed multigraph of Intent,
//!    Content, and Outcome nodes plus per-session path state
//! 2. Derive statistics (failure rate, break rate, drop-off rate, path
//!    value) memoized per graph generation
//! 3. Answer a fixed catalogue of analytic queries deterministically
//!
//! ## Architecture
//!
//! ```text
//! Signal → GraphBuilder → JourneyGraph ← Scorer (generation-keyed cache)
//!                              ↑              ↑
//!                          QueryEngine ───────┘
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same graph generation → bit-identical query results
//! - Node ordering is canonical (kind, then id); edge ordering is (from, to)
//! - Every ranking has a total tie-break ending at node/edge identity
//!
//! The engine has no durable persistence and no network surface; it is an
//! internal library fed by an ingestion pipeline and read by dashboards.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod engine;
pub mod scorer;
pub mod store;
pub mod types;

// Re-exports
pub use builder::{GraphBuilder, SignalError};
pub use engine::{
    ContentBreak, DropOffPoint, FlowEdge, IntentFailure, JourneyAggregate, QueryEngine,
};
pub use scorer::{CacheConfig, CacheStats, Scorer};
pub use store::JourneyGraph;
pub use types::{
    AnalyticsQuery, EdgeKey, EdgeStats, NodeId, NodeKind, QueryReport, Session, SessionState,
    Signal,
};

/// Schema version for all journey graph types.
/// Increment on breaking changes to any boundary type.
pub const JOURNEY_SCHEMA_VERSION: &str = "1.0.0";

/// Default result limit for analytic queries that omit one.
pub const DEFAULT_QUERY_LIMIT: usize = 10;
