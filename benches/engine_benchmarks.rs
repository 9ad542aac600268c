use std::path::Path;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sieve_core::fingerprint;
use sieve_fs::{diff, Entry, Snapshot};

fn flat_entries(count: usize, start_size: u64) -> Vec<Entry> {
    (0..count)
        .map(|i| Entry {
            relative_path: format!("src/file_{:05}.js", i),
            size: start_size,
            mtime: i as i64,
            mode: 0o644,
        })
        .collect()
}

/// `TreeDiff` over two snapshots that differ only in the last 1% of
/// entries — the common incremental-rebuild case this engine optimizes
/// for (most files unchanged, a handful touched).
fn bench_tree_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_diff");
    group.measurement_time(Duration::from_secs(10));

    for size in [100, 1_000, 10_000].iter() {
        let prev = Snapshot::from_entries(flat_entries(*size, 100));

        let changed_count = (*size / 100).max(1);
        let mut next_entries = flat_entries(*size, 100);
        for entry in next_entries.iter_mut().take(changed_count) {
            entry.size += 1;
            entry.mtime += 1;
        }
        let next = Snapshot::from_entries(next_entries);

        group.bench_with_input(BenchmarkId::from_parameter(format!("{size}_entries")), size, |b, _| {
            b.iter(|| black_box(diff::diff(black_box(&prev), black_box(&next))))
        });
    }

    group.finish();
}

/// `TreeDiff` building the initial snapshot from an empty tree — the
/// cold-start path, dominated by `mkdir`/`create` emission rather than
/// comparison.
fn bench_tree_diff_cold_start(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_diff_cold_start");

    for size in [100, 1_000, 10_000].iter() {
        let empty = Snapshot::<Entry>::empty();
        let next = Snapshot::from_entries(flat_entries(*size, 100));

        group.bench_with_input(BenchmarkId::from_parameter(format!("{size}_entries")), size, |b, _| {
            b.iter(|| black_box(diff::diff(black_box(&empty), black_box(&next))))
        });
    }

    group.finish();
}

/// `Fingerprint::hash_bytes` / `file_cache_key` over representative
/// source-file sizes, since every cache lookup on the hot path pays this
/// cost once per file per build.
fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");

    for size in [256usize, 4_096, 65_536].iter() {
        let contents = vec![b'x'; *size];

        group.bench_with_input(BenchmarkId::from_parameter(format!("hash_bytes_{size}")), size, |b, _| {
            b.iter(|| black_box(fingerprint::hash_bytes(black_box(&contents))))
        });

        group.bench_with_input(BenchmarkId::from_parameter(format!("file_cache_key_{size}")), size, |b, _| {
            b.iter(|| black_box(fingerprint::file_cache_key(black_box(&contents), "src/file.js")))
        });
    }

    group.finish();
}

/// A real directory walk, for comparison against the pure in-memory
/// `TreeDiff` numbers above — this is the one benchmark that touches
/// disk, so it gets its own small fixture tree rather than reusing the
/// synthetic snapshots above.
fn bench_walk(c: &mut Criterion) {
    let temp_dir = std::env::temp_dir().join(format!("sieve-bench-walk-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&temp_dir);
    std::fs::create_dir_all(&temp_dir).unwrap();

    for i in 0..500 {
        let dir = temp_dir.join(format!("mod_{:03}", i / 20));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("file_{i:04}.js")), b"module.exports = {};").unwrap();
    }

    let mut group = c.benchmark_group("walk");
    group.sample_size(20);
    group.bench_function("500_files_across_25_dirs", |b| {
        b.iter(|| black_box(sieve_fs::walk(black_box(Path::new(&temp_dir))).unwrap()))
    });
    group.finish();

    let _ = std::fs::remove_dir_all(&temp_dir);
}

criterion_group!(benches, bench_tree_diff, bench_tree_diff_cold_start, bench_fingerprint, bench_walk);
criterion_main!(benches);
