//! Analytic query engine over the journey graph.
//!
//! The engine is an explicit service object: construct it once from the
//! builder whose graph it should read, share it by handle, and construct a
//! fresh instance where a reset is needed (tests each own their engine, a
//! graph reload in production gets a new one). There is no process-wide
//! singleton.
//!
//! Every query returns a [`QueryReport`] envelope and never fails: unknown
//! query types resolve to empty results, zero denominators resolve to zero
//! rates, and an internal serialization fault degrades the report to empty
//! results with an `error` metadata entry instead of propagating.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::builder::GraphBuilder;
use crate::scorer::{self, Scorer};
use crate::store::JourneyGraph;
use crate::types::{AnalyticsQuery, EdgeKey, NodeId, NodeKind, QueryReport};

/// One intent ranked by failure rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentFailure {
    /// Intent identifier.
    pub intent: String,
    /// Fraction of this intent's sessions that bounced.
    pub failure_rate: f64,
    /// Sessions that declared this intent.
    pub sessions: u64,
    /// Of those, sessions that bounced.
    pub bounces: u64,
}

/// One content node ranked by break rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBreak {
    /// Content identifier.
    pub content: String,
    /// Fraction of visiting sessions that broke off here.
    pub break_rate: f64,
    /// Sessions that visited this content.
    pub sessions: u64,
    /// Of those, sessions that bounced with this as their last content.
    pub breaks: u64,
}

/// One distinct conversion journey with its aggregate value and frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyAggregate {
    /// Node labels in traversal order, terminal Outcome node included.
    pub path: Vec<String>,
    /// Total conversion value attributed to this journey.
    pub value: f64,
    /// Number of sessions that followed this journey.
    pub frequency: u64,
}

/// One edge ranked by drop-off rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropOffPoint {
    /// Source node label.
    pub from: String,
    /// Target node label.
    pub to: String,
    /// Fraction of traversing sessions that bounced.
    pub drop_off_rate: f64,
    /// Total recorded traversals of this edge.
    pub traversals: u64,
}

/// One Sankey edge of the intent flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    /// Source node label.
    pub source: String,
    /// Target node label.
    pub target: String,
    /// Traversal count.
    pub value: u64,
}

/// Stateless façade combining the builder's graph with a scorer.
///
/// Cheap to clone-by-construction: it holds only a graph handle and the
/// scorer's cache. Queries take the graph read lock once for their whole
/// computation, so the generation and the state it tags are always read
/// together.
pub struct QueryEngine {
    graph: Arc<RwLock<JourneyGraph>>,
    scorer: Scorer,
}

impl QueryEngine {
    /// Create an engine reading the given builder's graph.
    pub fn new(builder: &GraphBuilder) -> Self {
        Self::with_scorer(builder, Scorer::new())
    }

    /// Create an engine with a custom scorer (cache configuration).
    pub fn with_scorer(builder: &GraphBuilder, scorer: Scorer) -> Self {
        Self {
            graph: Arc::clone(builder.graph()),
            scorer,
        }
    }

    /// The scorer, for cache inspection and explicit cache reset.
    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Intent nodes ranked by failure rate descending.
    ///
    /// Ties break by session volume descending, then intent id ascending.
    pub fn failing_intents(&self, limit: usize) -> QueryReport<IntentFailure> {
        let started = Instant::now();
        let graph = self.graph.read();

        let mut rows: Vec<IntentFailure> = graph
            .nodes_of_kind(NodeKind::Intent)
            .map(|node| {
                let (sessions, bounces) = scorer::intent_volume(&graph, &node.id);
                IntentFailure {
                    intent: node.id.clone(),
                    failure_rate: self.scorer.failure_rate(&graph, &node.id),
                    sessions,
                    bounces,
                }
            })
            .collect();

        let considered = rows.len();
        rows.sort_by(|a, b| {
            b.failure_rate
                .partial_cmp(&a.failure_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.sessions.cmp(&a.sessions))
                .then_with(|| a.intent.cmp(&b.intent))
        });
        rows.truncate(limit);

        let metadata = metadata([
            ("sessions_considered", json!(graph.num_sessions())),
            ("intents_considered", json!(considered)),
        ]);
        report(
            AnalyticsQuery::FailingIntents { limit },
            started,
            rows,
            metadata,
        )
    }

    /// Content nodes ranked by break rate descending.
    ///
    /// Same tie-break rule as [`failing_intents`](Self::failing_intents).
    pub fn breaking_content(&self, limit: usize) -> QueryReport<ContentBreak> {
        let started = Instant::now();
        let graph = self.graph.read();

        let mut rows: Vec<ContentBreak> = graph
            .nodes_of_kind(NodeKind::Content)
            .map(|node| {
                let (sessions, breaks) = scorer::content_volume(&graph, &node.id);
                ContentBreak {
                    content: node.id.clone(),
                    break_rate: self.scorer.break_rate(&graph, &node.id),
                    sessions,
                    breaks,
                }
            })
            .collect();

        let considered = rows.len();
        rows.sort_by(|a, b| {
            b.break_rate
                .partial_cmp(&a.break_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.sessions.cmp(&a.sessions))
                .then_with(|| a.content.cmp(&b.content))
        });
        rows.truncate(limit);

        let metadata = metadata([
            ("sessions_considered", json!(graph.num_sessions())),
            ("content_considered", json!(considered)),
        ]);
        report(
            AnalyticsQuery::BreakingContent { limit },
            started,
            rows,
            metadata,
        )
    }

    /// Distinct conversion journeys ranked by aggregate value descending.
    ///
    /// Ties break by frequency descending, then path ascending.
    pub fn high_value_paths(&self, limit: usize) -> QueryReport<JourneyAggregate> {
        let started = Instant::now();
        let graph = self.graph.read();

        let mut rows = self.conversion_journeys(&graph);
        let considered = rows.len();
        rows.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.frequency.cmp(&a.frequency))
                .then_with(|| a.path.cmp(&b.path))
        });
        rows.truncate(limit);

        let metadata = metadata([
            ("sessions_considered", json!(graph.num_sessions())),
            ("journeys_considered", json!(considered)),
        ]);
        report(
            AnalyticsQuery::HighValuePaths { limit },
            started,
            rows,
            metadata,
        )
    }

    /// Distinct conversion journeys ranked by traversal frequency descending.
    ///
    /// Frequency, not value, distinguishing this from
    /// [`high_value_paths`](Self::high_value_paths). Ties break by value
    /// descending, then path ascending.
    pub fn conversion_paths(&self, limit: usize) -> QueryReport<JourneyAggregate> {
        let started = Instant::now();
        let graph = self.graph.read();

        let mut rows = self.conversion_journeys(&graph);
        let considered = rows.len();
        rows.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| {
                    b.value
                        .partial_cmp(&a.value)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.path.cmp(&b.path))
        });
        rows.truncate(limit);

        let metadata = metadata([
            ("sessions_considered", json!(graph.num_sessions())),
            ("journeys_considered", json!(considered)),
        ]);
        report(
            AnalyticsQuery::ConversionPaths { limit },
            started,
            rows,
            metadata,
        )
    }

    /// Edges ranked by drop-off rate descending.
    ///
    /// Ties break by traversal count descending, then canonical edge order.
    pub fn drop_off_points(&self, limit: usize) -> QueryReport<DropOffPoint> {
        let started = Instant::now();
        let graph = self.graph.read();

        let mut scored: Vec<(&EdgeKey, u64, f64)> = graph
            .edges()
            .map(|(key, stats)| (key, stats.count, self.scorer.drop_off_rate(&graph, key)))
            .collect();

        let considered = scored.len();
        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.0.cmp(b.0))
        });
        scored.truncate(limit);

        let rows: Vec<DropOffPoint> = scored
            .into_iter()
            .map(|(key, traversals, drop_off_rate)| DropOffPoint {
                from: key.from.label(),
                to: key.to.label(),
                drop_off_rate,
                traversals,
            })
            .collect();

        let metadata = metadata([
            ("sessions_considered", json!(graph.num_sessions())),
            ("edges_considered", json!(considered)),
        ]);
        report(
            AnalyticsQuery::DropOffPoints { limit },
            started,
            rows,
            metadata,
        )
    }

    /// Sankey-style edge list over the whole graph, or restricted to edges
    /// traversed by sessions declaring `intent`.
    ///
    /// Sorted by value descending, ties by canonical edge order.
    pub fn intent_flow(&self, intent: Option<&str>, limit: usize) -> QueryReport<FlowEdge> {
        let started = Instant::now();
        let graph = self.graph.read();

        let (flows, sessions_considered): (BTreeMap<EdgeKey, u64>, usize) =
            match intent {
                None => (
                    graph
                        .edges()
                        .map(|(key, stats)| (key.clone(), stats.count))
                        .collect(),
                    graph.num_sessions(),
                ),
                Some(intent) => {
                    let mut counts = BTreeMap::new();
                    let mut matching = 0;
                    for session in graph.sessions() {
                        if !session.declared_intent(intent) {
                            continue;
                        }
                        matching += 1;
                        for edge in session.traversed_edges() {
                            *counts.entry(edge).or_default() += 1;
                        }
                    }
                    (counts, matching)
                }
            };

        let considered = flows.len();
        let mut scored: Vec<(EdgeKey, u64)> = flows.into_iter().collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(limit);

        let rows: Vec<FlowEdge> = scored
            .into_iter()
            .map(|(key, value)| FlowEdge {
                source: key.from.label(),
                target: key.to.label(),
                value,
            })
            .collect();

        let metadata = metadata([
            ("sessions_considered", json!(sessions_considered)),
            ("edges_considered", json!(considered)),
        ]);
        report(
            AnalyticsQuery::IntentFlow {
                intent: intent.map(str::to_string),
                limit,
            },
            started,
            rows,
            metadata,
        )
    }

    /// Generic dispatch over the closed query catalogue.
    ///
    /// Result rows are serialized so one envelope serves every dashboard
    /// widget. Unrecognized queries yield empty results, never an error.
    pub fn execute(&self, query: &AnalyticsQuery) -> QueryReport<serde_json::Value> {
        match query {
            AnalyticsQuery::FailingIntents { limit } => to_generic(self.failing_intents(*limit)),
            AnalyticsQuery::BreakingContent { limit } => to_generic(self.breaking_content(*limit)),
            AnalyticsQuery::HighValuePaths { limit } => to_generic(self.high_value_paths(*limit)),
            AnalyticsQuery::DropOffPoints { limit } => to_generic(self.drop_off_points(*limit)),
            AnalyticsQuery::ConversionPaths { limit } => to_generic(self.conversion_paths(*limit)),
            AnalyticsQuery::IntentFlow { intent, limit } => {
                to_generic(self.intent_flow(intent.as_deref(), *limit))
            }
            AnalyticsQuery::Unrecognized => {
                debug!("unrecognized query type, returning empty results");
                QueryReport {
                    results: Vec::new(),
                    duration_ms: 0.0,
                    query: AnalyticsQuery::Unrecognized,
                    executed_at: Utc::now(),
                    metadata: BTreeMap::new(),
                }
            }
        }
    }

    /// Group closed-converted sessions by exact journey.
    fn conversion_journeys(&self, graph: &JourneyGraph) -> Vec<JourneyAggregate> {
        let mut groups: BTreeMap<Vec<NodeId>, u64> = BTreeMap::new();
        for session in graph.sessions() {
            if session.conversion_value().is_none() {
                continue;
            }
            if let Some(journey) = session.journey() {
                *groups.entry(journey).or_default() += 1;
            }
        }

        groups
            .into_iter()
            .map(|(journey, frequency)| {
                let value = self.scorer.path_value(graph, &journey);
                JourneyAggregate {
                    path: journey.iter().map(|n| n.label()).collect(),
                    value,
                    frequency,
                }
            })
            .collect()
    }
}

fn report<T>(
    query: AnalyticsQuery,
    started: Instant,
    results: Vec<T>,
    metadata: BTreeMap<String, serde_json::Value>,
) -> QueryReport<T> {
    QueryReport {
        results,
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        query,
        executed_at: Utc::now(),
        metadata,
    }
}

fn metadata<const N: usize>(
    entries: [(&str, serde_json::Value); N],
) -> BTreeMap<String, serde_json::Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Serialize typed rows into a generic report, degrading to empty results
/// with an `error` metadata entry if serialization fails.
fn to_generic<T: Serialize>(typed: QueryReport<T>) -> QueryReport<serde_json::Value> {
    let QueryReport {
        results,
        duration_ms,
        query,
        executed_at,
        mut metadata,
    } = typed;

    let mut rows = Vec::with_capacity(results.len());
    for row in &results {
        match serde_json::to_value(row) {
            Ok(value) => rows.push(value),
            Err(e) => {
                warn!(error = %e, ?query, "query result serialization failed, degrading");
                metadata.insert("error".to_string(), json!(e.to_string()));
                rows.clear();
                break;
            }
        }
    }

    QueryReport {
        results: rows,
        duration_ms,
        query,
        executed_at,
        metadata,
    }
}
