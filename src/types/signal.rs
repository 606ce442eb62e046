//! Behavioral signals consumed by the graph builder.
//!
//! Signals are the transient input of the engine: one observed event per
//! call, tagged with a session id and timestamp. They are not retained as
//! such: the builder folds each into the graph and discards it.

use serde::{Deserialize, Serialize};

/// One observed behavioral event.
///
/// The wire shape matches the instrumentation pipeline:
///
/// ```json
/// { "type": "visit", "sessionId": "s1", "intent": "search",
///   "source": "organic", "contentId": "paris-guide", "timestamp": 1710000000000 }
/// ```
///
/// Timestamps are unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Signal {
    /// A page visit: the session saw `content_id` while pursuing `intent`.
    Visit {
        /// Per-visitor session identifier.
        session_id: String,
        /// Declared visitor goal.
        intent: String,
        /// Traffic source (organic, referral, ...). Carried for the caller;
        /// the graph does not key anything on it.
        source: String,
        /// Identifier of the visited content.
        content_id: String,
        /// Event time, unix milliseconds.
        timestamp: i64,
    },
    /// A terminal conversion with an attributed monetary value.
    Conversion {
        /// Per-visitor session identifier.
        session_id: String,
        /// Conversion outcome identifier (e.g. "booking").
        outcome: String,
        /// Value attributed to the conversion.
        value: f64,
        /// Event time, unix milliseconds.
        timestamp: i64,
    },
    /// A terminal bounce.
    Bounce {
        /// Per-visitor session identifier.
        session_id: String,
        /// Optional outcome identifier; defaults to "bounce" when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outcome: Option<String>,
        /// Event time, unix milliseconds.
        timestamp: i64,
    },
}

impl Signal {
    /// The session this signal belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            Self::Visit { session_id, .. }
            | Self::Conversion { session_id, .. }
            | Self::Bounce { session_id, .. } => session_id,
        }
    }

    /// Event time, unix milliseconds.
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Visit { timestamp, .. }
            | Self::Conversion { timestamp, .. }
            | Self::Bounce { timestamp, .. } => *timestamp,
        }
    }

    /// Whether this signal terminates a session.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Visit { .. })
    }
}
