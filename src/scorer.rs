//! Derived statistics over the journey graph, memoized per generation.
//!
//! ## Cache Key Design
//!
//! Each scalar score is cached under an xxHash64 digest of all fields that
//! determine its value:
//!
//! - the statistic tag (`failure_rate`, `break_rate`, ...)
//! - the target (node id, edge key, or journey sequence)
//! - the graph generation
//!
//! Because the generation is part of the key, a successful `process_signal`
//! invalidates every previously cached score without an explicit clear: no
//! old key can match the new generation. `clear_cache()` exists for explicit
//! memory reset and never touches the graph or its generation.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::RwLock;
use tracing::trace;
use xxhash_rust::xxh64::Xxh64;

use crate::store::JourneyGraph;
use crate::types::{EdgeKey, NodeId};

const FAILURE_RATE_TAG: &str = "failure_rate";
const BREAK_RATE_TAG: &str = "break_rate";
const DROP_OFF_RATE_TAG: &str = "drop_off_rate";
const PATH_VALUE_TAG: &str = "path_value";

/// Configuration for the score cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_entries: usize,
    /// Whether to enable the cache.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            enabled: true,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Maximum capacity of the cache.
    pub cap: usize,
}

/// Cache key for one memoized score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ScoreKey(u64);

impl ScoreKey {
    fn compute(tag: &str, generation: u64, write_target: impl FnOnce(&mut Xxh64)) -> Self {
        let mut hasher = Xxh64::new(0);
        hasher.update(tag.as_bytes());
        hasher.update(&[0]);
        write_target(&mut hasher);
        hasher.update(&generation.to_le_bytes());
        Self(hasher.digest())
    }
}

fn write_node(hasher: &mut Xxh64, node: &NodeId) {
    hasher.update(&[node.kind as u8]);
    hasher.update(node.id.as_bytes());
    hasher.update(&[0]);
}

/// Computes named statistics over the journey graph.
///
/// Thread-safe: the cache sits behind its own `RwLock`, and every score
/// method takes the graph by shared reference, so callers hold the graph
/// read lock across the generation read and the computation.
pub struct Scorer {
    cache: Option<Arc<RwLock<LruCache<ScoreKey, f64>>>>,
}

impl Scorer {
    /// Create a scorer with the default cache configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a scorer with a custom cache configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        let cache = if config.enabled {
            let size = NonZeroUsize::new(config.max_entries)
                .unwrap_or_else(|| NonZeroUsize::new(1000).expect("1000 is non-zero"));
            Some(Arc::new(RwLock::new(LruCache::new(size))))
        } else {
            None
        };

        Self { cache }
    }

    /// Fraction of sessions declaring `intent` that terminated in a bounce.
    ///
    /// `0.0` when no session declared the intent.
    pub fn failure_rate(&self, graph: &JourneyGraph, intent: &str) -> f64 {
        let key = ScoreKey::compute(FAILURE_RATE_TAG, graph.generation(), |h| {
            h.update(intent.as_bytes());
        });
        self.cached(key, || {
            let (total, bounced) = intent_volume(graph, intent);
            ratio(bounced, total)
        })
    }

    /// Fraction of sessions that visited `content` whose journey ended in a
    /// bounce with this node as the last visited content.
    pub fn break_rate(&self, graph: &JourneyGraph, content: &str) -> f64 {
        let key = ScoreKey::compute(BREAK_RATE_TAG, graph.generation(), |h| {
            h.update(content.as_bytes());
        });
        self.cached(key, || {
            let (visited, broke) = content_volume(graph, content);
            ratio(broke, visited)
        })
    }

    /// Fraction of sessions traversing `edge` that terminated in a bounce.
    pub fn drop_off_rate(&self, graph: &JourneyGraph, edge: &EdgeKey) -> f64 {
        let key = ScoreKey::compute(DROP_OFF_RATE_TAG, graph.generation(), |h| {
            write_node(h, &edge.from);
            write_node(h, &edge.to);
        });
        self.cached(key, || {
            let (traversed, dropped) = edge_traffic(graph, edge);
            ratio(dropped, traversed)
        })
    }

    /// Total conversion value of sessions following this exact node
    /// sequence (terminal Outcome node included) to a conversion.
    pub fn path_value(&self, graph: &JourneyGraph, journey: &[NodeId]) -> f64 {
        let key = ScoreKey::compute(PATH_VALUE_TAG, graph.generation(), |h| {
            for node in journey {
                write_node(h, node);
            }
        });
        self.cached(key, || {
            graph
                .sessions()
                .filter_map(|s| {
                    let value = s.conversion_value()?;
                    (s.journey().as_deref() == Some(journey)).then_some(value)
                })
                .sum()
        })
    }

    /// Empty the cache without touching the graph or its generation.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.write().clear();
        }
    }

    /// Cache statistics, `None` when caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| {
            let cache = cache.read();
            CacheStats {
                len: cache.len(),
                cap: cache.cap().get(),
            }
        })
    }

    fn cached(&self, key: ScoreKey, compute: impl FnOnce() -> f64) -> f64 {
        if let Some(cache) = &self.cache {
            if let Some(&score) = cache.read().peek(&key) {
                trace!(key = key.0, score, "score cache hit");
                return score;
            }
        }

        let score = compute();

        if let Some(cache) = &self.cache {
            cache.write().put(key, score);
            trace!(key = key.0, score, "score cache miss");
        }

        score
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Count sessions declaring `intent`: (total, bounced).
pub fn intent_volume(graph: &JourneyGraph, intent: &str) -> (u64, u64) {
    let mut total = 0;
    let mut bounced = 0;
    for session in graph.sessions() {
        if session.declared_intent(intent) {
            total += 1;
            if session.bounced() {
                bounced += 1;
            }
        }
    }
    (total, bounced)
}

/// Count sessions that visited the Content node `content`:
/// (visited, broke-there), where "broke there" means the session bounced
/// and this node was the last content it visited.
pub fn content_volume(graph: &JourneyGraph, content: &str) -> (u64, u64) {
    let node = NodeId::content(content);

    let mut visited = 0;
    let mut broke = 0;
    for session in graph.sessions() {
        if !session.path.contains(&node) {
            continue;
        }
        visited += 1;
        if session.bounced() && session.last_content_node() == Some(&node) {
            broke += 1;
        }
    }
    (visited, broke)
}

/// Count sessions traversing `edge`: (traversed, dropped), where "dropped"
/// means the session terminated in a bounce.
pub fn edge_traffic(graph: &JourneyGraph, edge: &EdgeKey) -> (u64, u64) {
    let mut traversed = 0;
    let mut dropped = 0;
    for session in graph.sessions() {
        if session.traversed(edge) {
            traversed += 1;
            if session.bounced() {
                dropped += 1;
            }
        }
    }
    (traversed, dropped)
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    // Rates are never NaN by contract
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
