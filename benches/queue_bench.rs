//! Priority queue throughput benchmarks.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use priority_dispatch::core::{Priority, PriorityQueue, WorkItem};

fn mixed_items(n: u64) -> Vec<WorkItem> {
    (0..n)
        .map(|i| {
            let priority = Priority::new(u8::try_from(i % 5).unwrap() + 1).unwrap();
            WorkItem::new(i, priority, i % 10 == 0)
        })
        .collect()
}

fn bench_push_pop(c: &mut Criterion) {
    let items = mixed_items(1000);

    c.bench_function("queue_push_1k_mixed", |b| {
        b.iter(|| {
            let queue = PriorityQueue::new();
            for item in &items {
                queue.push(black_box(*item));
            }
            queue
        });
    });

    c.bench_function("queue_push_pop_1k_mixed", |b| {
        b.iter(|| {
            let queue = PriorityQueue::new();
            for item in &items {
                queue.push(*item);
            }
            // Close so the final pop returns None instead of blocking.
            queue.close();
            while let Some(item) = queue.pop_highest() {
                black_box(item);
            }
        });
    });
}

criterion_group!(benches, bench_push_pop);
criterion_main!(benches);
