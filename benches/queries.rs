//! Performance benchmarks for signal ingestion and analytic queries.
//!
//! Run with: `cargo bench --bench queries`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Signal ingestion | <10μs per signal | Single write-lock mutation |
//! | Cold query | O(sessions) | Full statistic computation |
//! | Cached query | ~constant | Generation-keyed LRU hit |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use journey_kernel::{GraphBuilder, QueryEngine, Signal};

/// Seed a graph with `sessions` three-visit sessions across a small id
/// universe; every third session bounces, the rest convert.
fn seed(builder: &GraphBuilder, sessions: usize) {
    for i in 0..sessions {
        let id = format!("s-{i}");
        let intent = format!("intent-{}", i % 8);
        for step in 0..3 {
            builder
                .process_signal(&Signal::Visit {
                    session_id: id.clone(),
                    intent: intent.clone(),
                    source: "organic".to_string(),
                    content_id: format!("page-{}", (i + step) % 32),
                    timestamp: i as i64,
                })
                .unwrap();
        }
        let terminal = if i % 3 == 0 {
            Signal::Bounce {
                session_id: id,
                outcome: None,
                timestamp: i as i64,
            }
        } else {
            Signal::Conversion {
                session_id: id,
                outcome: "booking".to_string(),
                value: 40.0,
                timestamp: i as i64,
            }
        };
        builder.process_signal(&terminal).unwrap();
    }
}

fn bench_ingestion(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingestion");

    for sessions in [100, 1_000] {
        group.throughput(Throughput::Elements(sessions as u64 * 4));
        group.bench_with_input(
            BenchmarkId::from_parameter(sessions),
            &sessions,
            |b, &sessions| {
                b.iter(|| {
                    let builder = GraphBuilder::new();
                    seed(&builder, sessions);
                    black_box(builder);
                });
            },
        );
    }

    group.finish();
}

fn bench_failing_intents_cold(c: &mut Criterion) {
    let builder = GraphBuilder::new();
    seed(&builder, 1_000);
    let engine = QueryEngine::new(&builder);

    c.bench_function("failing_intents_cold", |b| {
        b.iter(|| {
            engine.scorer().clear_cache();
            black_box(engine.failing_intents(10));
        });
    });
}

fn bench_failing_intents_cached(c: &mut Criterion) {
    let builder = GraphBuilder::new();
    seed(&builder, 1_000);
    let engine = QueryEngine::new(&builder);

    // Populate the cache once; every iteration below is a generation hit
    engine.failing_intents(10);

    c.bench_function("failing_intents_cached", |b| {
        b.iter(|| {
            black_box(engine.failing_intents(10));
        });
    });
}

fn bench_intent_flow(c: &mut Criterion) {
    let builder = GraphBuilder::new();
    seed(&builder, 1_000);
    let engine = QueryEngine::new(&builder);

    c.bench_function("intent_flow_unrestricted", |b| {
        b.iter(|| {
            black_box(engine.intent_flow(None, 50));
        });
    });

    c.bench_function("intent_flow_restricted", |b| {
        b.iter(|| {
            black_box(engine.intent_flow(Some("intent-3"), 50));
        });
    });
}

criterion_group!(
    benches,
    bench_ingestion,
    bench_failing_intents_cold,
    bench_failing_intents_cached,
    bench_intent_flow,
);
criterion_main!(benches);
