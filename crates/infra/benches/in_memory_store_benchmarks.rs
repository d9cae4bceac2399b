use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use crewjobs_core::RecordId;
use crewjobs_engine::{DataAccess, Record};
use crewjobs_infra::InMemoryDataAccess;

/// Stand-in for a portal row with a (parent, employee) natural key.
#[derive(Debug, Clone)]
struct Row {
    id: Option<RecordId>,
    parent: i64,
    employee: i64,
}

impl Record for Row {
    const KIND: &'static str = "bench_row";

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn natural_key(&self) -> Option<String> {
        Some(format!("{}:{}", self.parent, self.employee))
    }
}

fn rows(parent: i64, count: usize) -> Vec<Row> {
    (0..count)
        .map(|e| Row {
            id: None,
            parent,
            employee: e as i64,
        })
        .collect()
}

fn bench_batch_save_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_save_throughput");

    for batch_size in [1, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("save_new", batch_size),
            batch_size,
            |b, &size| {
                let store = InMemoryDataAccess::new();
                let mut parent = 0;

                b.iter(|| {
                    parent += 1;
                    black_box(store.save(rows(parent, size), true).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_filtered_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_get");

    for table_size in [100, 1000, 10000].iter() {
        group.bench_with_input(
            BenchmarkId::new("get_by_parent", table_size),
            table_size,
            |b, &size| {
                let store = InMemoryDataAccess::new();
                for parent in 0..(size / 10) as i64 {
                    store.save(rows(parent, 10), true).unwrap();
                }

                b.iter(|| {
                    black_box(store.get(|r: &Row| r.parent == 3).unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_batch_save_throughput, bench_filtered_get);
criterion_main!(benches);
