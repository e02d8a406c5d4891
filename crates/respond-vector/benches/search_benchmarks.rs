//! Benchmarks for vector search over the in-memory store.
//!
//! Uses 1,000 reports by default. Set `BENCH_FULL_SCALE=1` to run against
//! 20,000 reports:
//!
//! ```bash
//! BENCH_FULL_SCALE=1 cargo bench -p respond-vector
//! ```

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use uuid::Uuid;

use respond_core::types::{GeoPoint, Payload};
use respond_vector::embedding::{EmbeddingService, MockEmbedding};
use respond_vector::filter::{Condition, Filter};
use respond_vector::store::{InMemoryVectorStore, VectorStore};

const CI_REPORT_COUNT: usize = 1_000;
const FULL_SCALE_REPORT_COUNT: usize = 20_000;
const COLLECTION: &str = "respond_incidents";

const ZONES: [&str; 4] = ["zone-north", "zone-south", "zone-east", "zone-west"];
const URGENCIES: [&str; 4] = ["low", "medium", "high", "critical"];

fn report_text(index: usize) -> String {
    format!(
        "Flooding reported on the main road near the river crossing. Water is \
         rising quickly and several cars are stuck. Residents on the lower floors \
         are asking for evacuation support. Report number {}",
        index
    )
}

fn report_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_REPORT_COUNT
    } else {
        CI_REPORT_COUNT
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
}

/// Build a store populated with `count` reports spread over four zones.
fn build_populated_store(rt: &tokio::runtime::Runtime, count: usize) -> InMemoryVectorStore {
    let store = InMemoryVectorStore::new();
    let embedder = MockEmbedding::new();

    rt.block_on(async {
        store
            .create_collection(COLLECTION, embedder.dimensions())
            .await
            .expect("create collection failed");

        for i in 0..count {
            let vector = embedder.embed(&report_text(i)).await.expect("embed failed");
            let payload: Payload = serde_json::json!({
                "zone_id": ZONES[i % ZONES.len()],
                "urgency": URGENCIES[i % URGENCIES.len()],
                "status": "pending",
                "location": {"lat": 40.0 + (i % 100) as f64 * 0.001, "lon": -74.0},
                "timestamp_unix": 1_700_000_000 + i as i64,
            })
            .as_object()
            .cloned()
            .unwrap_or_default();
            store
                .upsert(COLLECTION, Uuid::new_v4(), vector, payload)
                .await
                .expect("upsert failed");
        }
    });

    assert_eq!(store.len(COLLECTION), count, "Store should contain all reports");
    store
}

fn bench_search(c: &mut Criterion) {
    let count = report_count();
    let rt = runtime();
    let store = build_populated_store(&rt, count);

    let query = rt
        .block_on(MockEmbedding::new().embed("water rising near the river"))
        .expect("query embed failed");

    let mut group = c.benchmark_group("vector_search");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function(format!("unfiltered_top10_{}reports", count), |b| {
        b.iter(|| {
            let hits = rt
                .block_on(store.search(COLLECTION, &query, 10, None))
                .expect("search failed");
            assert!(!hits.is_empty(), "Search should return results");
            hits
        });
    });

    let zone_filter = Filter {
        must: vec![
            Condition::Match {
                key: "zone_id".to_string(),
                value: serde_json::json!("zone-north"),
            },
            Condition::Match {
                key: "urgency".to_string(),
                value: serde_json::json!("critical"),
            },
        ],
    };
    group.bench_function(format!("zone_urgency_top10_{}reports", count), |b| {
        b.iter(|| {
            rt.block_on(store.search(COLLECTION, &query, 10, Some(&zone_filter)))
                .expect("search failed")
        });
    });

    let geo_filter = Filter {
        must: vec![Condition::GeoRadius {
            key: "location".to_string(),
            center: GeoPoint {
                lat: 40.02,
                lon: -74.0,
            },
            radius_m: 2_000.0,
        }],
    };
    group.bench_function(format!("geo_radius_top10_{}reports", count), |b| {
        b.iter(|| {
            rt.block_on(store.search(COLLECTION, &query, 10, Some(&geo_filter)))
                .expect("search failed")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
