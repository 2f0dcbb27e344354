//! Benchmarks for log append and state update throughput

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use statelog_wal::{EntryState, LogEntry, LogWriter, ManualLogSupervisor};
use tempfile::TempDir;

fn entry(i: usize) -> LogEntry {
    LogEntry::fresh(format!("key{:08}", i).into_bytes(), vec![0xAB; 128])
}

fn append_benchmarks(c: &mut Criterion) {
    c.bench_function("append_1000", |b| {
        b.iter_batched(
            || {
                let temp_dir = TempDir::new().unwrap();
                let writer =
                    LogWriter::open(temp_dir.path().join("bench.wal"), ManualLogSupervisor, 100_000)
                        .unwrap();
                (temp_dir, writer)
            },
            |(_temp_dir, writer)| {
                for i in 0..1000 {
                    writer.append(entry(i)).unwrap();
                }
                writer.close().unwrap();
            },
            BatchSize::PerIteration,
        )
    });

    c.bench_function("append_with_rollover_1000", |b| {
        b.iter_batched(
            || {
                let temp_dir = TempDir::new().unwrap();
                let writer =
                    LogWriter::open(temp_dir.path().join("bench.wal"), ManualLogSupervisor, 100)
                        .unwrap();
                (temp_dir, writer)
            },
            |(_temp_dir, writer)| {
                for i in 0..1000 {
                    writer.append(entry(i)).unwrap();
                }
                writer.close().unwrap();
            },
            BatchSize::PerIteration,
        )
    });

    c.bench_function("append_and_update_1000", |b| {
        b.iter_batched(
            || {
                let temp_dir = TempDir::new().unwrap();
                let writer =
                    LogWriter::open(temp_dir.path().join("bench.wal"), ManualLogSupervisor, 100_000)
                        .unwrap();
                (temp_dir, writer)
            },
            |(_temp_dir, writer)| {
                for i in 0..1000 {
                    let handle = writer.append(entry(i)).unwrap();
                    writer.update_state(&handle, EntryState::Processed).unwrap();
                }
                writer.close().unwrap();
            },
            BatchSize::PerIteration,
        )
    });
}

criterion_group!(benches, append_benchmarks);
criterion_main!(benches);
