//! Benchmarks for task submission and dispatch overhead

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use offload::prelude::*;

fn bench_assign_get(c: &mut Criterion) {
    let queue = WorkQueue::new().unwrap();

    c.bench_function("assign_get_roundtrip", |b| {
        b.iter(|| queue.assign(|x: u64| x + 1, (black_box(41),)).get().unwrap());
    });
}

fn bench_assign_batch(c: &mut Criterion) {
    let queue = WorkQueue::new().unwrap();

    c.bench_function("assign_batch_1000", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..1_000u64)
                .map(|i| queue.assign(|x: u64| black_box(x * x), (i,)))
                .collect();
            handles.into_iter().map(|h| h.get().unwrap()).sum::<u64>()
        });
    });
}

fn bench_dispatch(c: &mut Criterion) {
    c.bench_function("dispatch_16_and_drop", |b| {
        b.iter(|| {
            let dispatcher = Dispatcher::new();
            for i in 0..16u64 {
                dispatcher
                    .dispatch(|x: u64| drop(black_box(x)), (i,))
                    .unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_assign_get, bench_assign_batch, bench_dispatch);
criterion_main!(benches);
