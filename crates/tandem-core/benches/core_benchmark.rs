//! Benchmark tests for tandem-core operations
//!
//! Run with: cargo bench -p tandem-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tandem_core::protocol::format_decimal;
use tandem_core::reconciler::shifted_base_time;
use tandem_core::{HeartbeatSnapshot, Message, PlaybackState, Reconciler};

// ============================================================================
// Helpers
// ============================================================================

fn sample_heartbeat() -> HeartbeatSnapshot {
    HeartbeatSnapshot {
        time: 1234.567891,
        volume: 0.75,
        muted: false,
        state: PlaybackState::Playing,
        base_time: 987_654_321_000,
    }
}

// ============================================================================
// Protocol
// ============================================================================

fn bench_heartbeat_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("Heartbeat Encoding");
    let heartbeat = sample_heartbeat();

    group.bench_function("encode", |b| {
        b.iter(|| black_box(&heartbeat).encode())
    });

    for &value in &[0.0, 12.5, 1234.567891, 1.0e-7, 3.0e9] {
        group.bench_with_input(BenchmarkId::new("format_decimal", value), &value, |b, &value| {
            b.iter(|| format_decimal(black_box(value)))
        });
    }

    group.finish();
}

fn bench_record_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Record Parsing");
    let heartbeat = sample_heartbeat().encode();

    group.bench_function("heartbeat", |b| {
        b.iter(|| HeartbeatSnapshot::parse(black_box(&heartbeat)))
    });

    for record in ["cp", "ct42.5", "cv0.25", "cm1"] {
        group.bench_with_input(BenchmarkId::new("command", record), record, |b, record| {
            b.iter(|| Message::parse(black_box(record)))
        });
    }

    group.finish();
}

// ============================================================================
// Reconciler
// ============================================================================

fn bench_reconciler_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("Reconciler Pass");

    group.bench_function("idle", |b| {
        let mut reconciler = Reconciler::default();
        b.iter(|| {
            let due = reconciler.tick_heartbeat();
            black_box((due, reconciler.seek_step(PlaybackState::Playing)))
        })
    });

    group.bench_function("seek_cycle", |b| {
        let mut reconciler = Reconciler::default();
        let mut target = 0.0;
        b.iter(|| {
            target = (target + 1.0) % 100.0;
            reconciler.set_time(black_box(target), 100.0, PlaybackState::Playing);
            reconciler.seek_step(PlaybackState::Playing);
            let step = reconciler.seek_step(PlaybackState::Ready);
            reconciler.complete_seek();
            black_box(step)
        })
    });

    group.bench_function("shifted_base_time", |b| {
        b.iter(|| shifted_base_time(black_box(50_000_000_000), black_box(10_000_000_000), black_box(10.0)))
    });

    group.finish();
}

criterion_group!(
    protocol_benches,
    bench_heartbeat_encoding,
    bench_record_parsing,
);

criterion_group!(
    reconciler_benches,
    bench_reconciler_pass,
);

criterion_main!(
    protocol_benches,
    reconciler_benches,
);
