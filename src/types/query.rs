//! Analytic query catalogue and the result envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::DEFAULT_QUERY_LIMIT;

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

/// Closed catalogue of analytic queries.
///
/// This is the engine's generic dispatch surface: dashboards send one of
/// these tagged objects to [`execute`](crate::engine::QueryEngine::execute).
/// Unknown wire tags deserialize to [`AnalyticsQuery::Unrecognized`], which
/// resolves to an empty result set rather than an error, so one unsupported
/// widget cannot fail a whole dashboard page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyticsQuery {
    /// Intent nodes ranked by failure rate.
    FailingIntents {
        /// Maximum number of results.
        #[serde(default = "default_limit")]
        limit: usize,
    },
    /// Content nodes ranked by break rate.
    BreakingContent {
        /// Maximum number of results.
        #[serde(default = "default_limit")]
        limit: usize,
    },
    /// Conversion journeys ranked by aggregate value.
    HighValuePaths {
        /// Maximum number of results.
        #[serde(default = "default_limit")]
        limit: usize,
    },
    /// Edges ranked by drop-off rate.
    DropOffPoints {
        /// Maximum number of results.
        #[serde(default = "default_limit")]
        limit: usize,
    },
    /// Conversion journeys ranked by traversal frequency.
    ConversionPaths {
        /// Maximum number of results.
        #[serde(default = "default_limit")]
        limit: usize,
    },
    /// Sankey-style edge list, optionally restricted to one intent.
    IntentFlow {
        /// Restrict to edges traversed by sessions declaring this intent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intent: Option<String>,
        /// Maximum number of results.
        #[serde(default = "default_limit")]
        limit: usize,
    },
    /// Catch-all for unknown query tags; always yields empty results.
    #[serde(other)]
    Unrecognized,
}

impl AnalyticsQuery {
    /// The configured result limit, zero for unrecognized queries.
    pub fn limit(&self) -> usize {
        match self {
            Self::FailingIntents { limit }
            | Self::BreakingContent { limit }
            | Self::HighValuePaths { limit }
            | Self::DropOffPoints { limit }
            | Self::ConversionPaths { limit }
            | Self::IntentFlow { limit, .. } => *limit,
            Self::Unrecognized => 0,
        }
    }
}

/// Envelope returned by every query.
///
/// `results` is query-specific; the rest is uniform so dashboards can
/// render timing and provenance without knowing the query type. On the
/// wire the envelope is `{results, duration, query, executedAt, metadata}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport<T> {
    /// Query-specific result rows.
    pub results: Vec<T>,
    /// Wall-clock time spent executing the query, milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: f64,
    /// The query that produced this report, echoed back.
    pub query: AnalyticsQuery,
    /// When the query executed.
    pub executed_at: DateTime<Utc>,
    /// Query-specific auxiliary counts, and an `error` entry when a report
    /// was degraded by an internal fault.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl<T> QueryReport<T> {
    /// Whether this report was degraded by an internal fault.
    pub fn is_degraded(&self) -> bool {
        self.metadata.contains_key("error")
    }
}
