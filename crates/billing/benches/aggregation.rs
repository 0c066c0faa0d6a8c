use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use namegrid_billing::aggregation::{refresh_status, ExecutionTally};
use namegrid_billing::order::OrderItemStatus;

fn status_cycle(n: usize) -> Vec<OrderItemStatus> {
    use OrderItemStatus::*;
    let cycle = [Processed, Pending, Failed, Started, Executing, Blocked];
    (0..n).map(|i| cycle[i % cycle.len()]).collect()
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("status_aggregation");
    for size in [8usize, 128, 2048] {
        let statuses = status_cycle(size);
        group.bench_with_input(BenchmarkId::new("refresh", size), &statuses, |b, s| {
            b.iter(|| refresh_status(s));
        });
        group.bench_with_input(BenchmarkId::new("pass", size), &statuses, |b, s| {
            b.iter(|| {
                let mut tally = ExecutionTally::new();
                for status in s {
                    tally.attempted();
                    tally.observe(*status);
                }
                tally.resolve()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_aggregation);
criterion_main!(benches);
