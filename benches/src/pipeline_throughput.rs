use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use keychunk::prelude::*;
use tokio::runtime::Runtime;

const RECORDS: i64 = 10_000;

fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    let parent = Key::new("Parent", 1);
    for id in 1..=RECORDS {
        let name = if id % 3 == 0 { "B" } else { "A" };
        store.put(
            Key::new("Item", id).with_parent(parent.clone()),
            PropertyMap::from([
                ("name".to_string(), Value::from(name)),
                ("score".to_string(), Value::Int(id % 100)),
            ]),
        );
    }
    Arc::new(store)
}

fn options(chunk_size: usize) -> Options<DynamicRecord> {
    let fields = vec!["name".to_string(), "score".to_string()];
    Options::new(move |_, key, _| vec![DynamicRecord::stub(key, &fields)]).with_chunk_size(chunk_size)
}

/// Full scan throughput across chunk sizes
fn bench_chunk_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_chunk_size");
    let runtime = Runtime::new().unwrap();
    let store = seeded_store();

    for chunk_size in [10, 100, 500, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.to_async(&runtime).iter(|| async {
                    let count = Pipeline::new(Arc::clone(&store), options(chunk_size))
                        .stream(Query::new("Item"))
                        .count_records()
                        .await
                        .unwrap();
                    black_box(count)
                });
            },
        );
    }

    group.finish();
}

/// Filtered scan: one in three records matches
fn bench_filtered(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let store = seeded_store();

    c.bench_function("pipeline_filtered_scan", |b| {
        b.to_async(&runtime).iter(|| async {
            let count = Pipeline::new(Arc::clone(&store), options(100))
                .stream(Query::new("Item").filter("name", "B"))
                .count_records()
                .await
                .unwrap();
            black_box(count)
        });
    });
}

criterion_group!(benches, bench_chunk_sizes, bench_filtered);
criterion_main!(benches);
