//! Property tests over arbitrary signal streams.
//!
//! The engine must hold its documented invariants for any input the
//! instrumentation pipeline could produce: rates stay in [0, 1], rankings
//! stay monotone, and ingestion never panics regardless of signal order.

use proptest::prelude::*;

use journey_kernel::{AnalyticsQuery, GraphBuilder, QueryEngine, Signal};

/// A small id universe so generated streams actually collide on sessions,
/// intents, and content.
fn id_strategy(prefix: &'static str) -> impl Strategy<Value = String> {
    (0u8..6).prop_map(move |n| format!("{prefix}{n}"))
}

fn signal_strategy() -> impl Strategy<Value = Signal> {
    prop_oneof![
        3 => (id_strategy("s"), id_strategy("i"), id_strategy("c"), 0i64..1_000_000).prop_map(
            |(session_id, intent, content_id, timestamp)| Signal::Visit {
                session_id,
                intent,
                source: "organic".to_string(),
                content_id,
                timestamp,
            }
        ),
        1 => (id_strategy("s"), 0.0f64..500.0, 0i64..1_000_000).prop_map(
            |(session_id, value, timestamp)| Signal::Conversion {
                session_id,
                outcome: "booking".to_string(),
                value,
                timestamp,
            }
        ),
        1 => (id_strategy("s"), proptest::option::of(id_strategy("o")), 0i64..1_000_000)
            .prop_map(|(session_id, outcome, timestamp)| Signal::Bounce {
                session_id,
                outcome,
                timestamp,
            }),
    ]
}

fn ingest(signals: &[Signal]) -> (GraphBuilder, QueryEngine) {
    let builder = GraphBuilder::new();
    let engine = QueryEngine::new(&builder);
    for signal in signals {
        // Rejections (closed sessions, unknown sessions) are expected in a
        // random stream; the contract is that they never corrupt state
        let _ = builder.process_signal(signal);
    }
    (builder, engine)
}

proptest! {
    #[test]
    fn failure_rates_stay_in_unit_interval(signals in prop::collection::vec(signal_strategy(), 0..120)) {
        let (_builder, engine) = ingest(&signals);

        for row in engine.failing_intents(usize::MAX).results {
            prop_assert!((0.0..=1.0).contains(&row.failure_rate));
            prop_assert!(row.bounces <= row.sessions);
        }
        for row in engine.breaking_content(usize::MAX).results {
            prop_assert!((0.0..=1.0).contains(&row.break_rate));
        }
        for row in engine.drop_off_points(usize::MAX).results {
            prop_assert!((0.0..=1.0).contains(&row.drop_off_rate));
        }
    }

    #[test]
    fn rankings_are_non_increasing(signals in prop::collection::vec(signal_strategy(), 0..120)) {
        let (_builder, engine) = ingest(&signals);

        let report = engine.failing_intents(usize::MAX);
        for pair in report.results.windows(2) {
            prop_assert!(pair[0].failure_rate >= pair[1].failure_rate);
        }

        let report = engine.drop_off_points(usize::MAX);
        for pair in report.results.windows(2) {
            prop_assert!(pair[0].drop_off_rate >= pair[1].drop_off_rate);
        }

        let report = engine.high_value_paths(usize::MAX);
        for pair in report.results.windows(2) {
            prop_assert!(pair[0].value >= pair[1].value);
        }

        let report = engine.conversion_paths(usize::MAX);
        for pair in report.results.windows(2) {
            prop_assert!(pair[0].frequency >= pair[1].frequency);
        }
    }

    #[test]
    fn repeated_execution_is_deterministic(signals in prop::collection::vec(signal_strategy(), 0..80)) {
        let (_builder, engine) = ingest(&signals);

        for query in [
            AnalyticsQuery::FailingIntents { limit: 16 },
            AnalyticsQuery::BreakingContent { limit: 16 },
            AnalyticsQuery::HighValuePaths { limit: 16 },
            AnalyticsQuery::DropOffPoints { limit: 16 },
            AnalyticsQuery::ConversionPaths { limit: 16 },
            AnalyticsQuery::IntentFlow { intent: None, limit: 16 },
        ] {
            let first = engine.execute(&query);
            let second = engine.execute(&query);
            prop_assert_eq!(&first.results, &second.results);

            // Cache-populated and freshly computed results must agree
            engine.scorer().clear_cache();
            let fresh = engine.execute(&query);
            prop_assert_eq!(&first.results, &fresh.results);
        }
    }

    #[test]
    fn clear_always_yields_empty_reports(signals in prop::collection::vec(signal_strategy(), 0..80)) {
        let (builder, engine) = ingest(&signals);
        builder.clear();

        prop_assert!(engine.failing_intents(16).results.is_empty());
        prop_assert!(engine.intent_flow(None, 16).results.is_empty());
        prop_assert!(engine.conversion_paths(16).results.is_empty());
    }
}
