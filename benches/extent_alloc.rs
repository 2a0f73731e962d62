//! Benchmarks for extent allocation and header access.
//!
//! Run: cargo bench --bench extent_alloc

use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use extentstore::context::{LockMode, Locker, OperationContext, ShutdownFlag};
use extentstore::durability::Journal;
use extentstore::storage::{AnonymousMapping, DataFile, FileAllocator, SizePolicy};
use extentstore::StorageOptions;

fn open_anonymous(ctx: &OperationContext<'_>) -> DataFile<AnonymousMapping> {
    let options = StorageOptions::small_files();
    let mut df = DataFile::with_mapped_file(0, AnonymousMapping::new(), options)
        .with_size_policy(SizePolicy::with_address_space(&options, false));
    df.open(ctx, Path::new("bench.0"), 0, false).unwrap();
    df
}

fn bench_alloc_extent_area(c: &mut Criterion) {
    let locker = Locker::new(LockMode::Exclusive);
    let shutdown = ShutdownFlag::new();
    let journal = Journal::new();
    let allocator = FileAllocator::new();
    let ctx = OperationContext::new(&locker, &shutdown, &journal, &allocator);

    c.bench_function("alloc_extent_area/1000x4KB", |b| {
        b.iter_batched(
            || open_anonymous(&ctx),
            |mut df| {
                for _ in 0..1000 {
                    black_box(df.alloc_extent_area(&ctx, 4096).unwrap());
                }
                journal.commit_transaction();
                if let Some(last) = journal.last_durable_sequence() {
                    journal.checkpoint(last);
                }
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_header_read(c: &mut Criterion) {
    let locker = Locker::new(LockMode::Exclusive);
    let shutdown = ShutdownFlag::new();
    let journal = Journal::new();
    let allocator = FileAllocator::new();
    let ctx = OperationContext::new(&locker, &shutdown, &journal, &allocator);
    let df = open_anonymous(&ctx);

    c.bench_function("header", |b| b.iter(|| black_box(df.header())));
}

fn bench_size_policy(c: &mut Criterion) {
    let policy = SizePolicy::with_address_space(&StorageOptions::default(), false);

    c.bench_function("open_size", |b| {
        b.iter(|| {
            for file_no in 0..16u32 {
                black_box(policy.open_size(file_no, black_box(300 << 20)).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_alloc_extent_area, bench_header_read, bench_size_policy);
criterion_main!(benches);
