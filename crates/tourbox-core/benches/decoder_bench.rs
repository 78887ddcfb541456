//! Criterion benchmarks for the run-length decoder.
//!
//! A session decodes every chunk synchronously on its read thread, so decode
//! latency bounds how quickly the next read can be issued.  These benches
//! cover the two extremes: long runs (knob spun hard) and run-free chatter
//! (worst case for grouping).
//!
//! Run with:
//! ```bash
//! cargo bench --package tourbox-core --bench decoder_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tourbox_core::{group_runs, ControlTable, Decoder, HeldStates};

/// One read-sized chunk of a hard knob spin: three long rotation runs.
fn make_run_heavy_chunk() -> Vec<u8> {
    let mut chunk = Vec::with_capacity(1024);
    chunk.extend(std::iter::repeat(0x84).take(400));
    chunk.extend(std::iter::repeat(0xC4).take(400));
    chunk.extend(std::iter::repeat(0x89).take(224));
    chunk
}

/// Worst case for grouping: no two consecutive bytes equal.
fn make_alternating_chunk() -> Vec<u8> {
    (0..1024u32)
        .map(|i| if i % 2 == 0 { 0x84 } else { 0xC4 })
        .collect()
}

/// A realistic mix: presses with firmware repeats, releases, rotation bursts.
fn make_mixed_chunk() -> Vec<u8> {
    let mut chunk = Vec::with_capacity(1024);
    while chunk.len() < 1000 {
        chunk.extend_from_slice(&[34, 34, 34, 162]); // C1 held, released
        chunk.extend(std::iter::repeat(0x84).take(12)); // knob ticks
        chunk.extend_from_slice(&[16, 144, 0xFF]); // up tap + junk byte
    }
    chunk
}

fn bench_group_runs(c: &mut Criterion) {
    let run_heavy = make_run_heavy_chunk();
    let alternating = make_alternating_chunk();

    let mut group = c.benchmark_group("group_runs");
    group.bench_function("run_heavy_1k", |b| {
        b.iter(|| group_runs(black_box(&run_heavy)))
    });
    group.bench_function("alternating_1k", |b| {
        b.iter(|| group_runs(black_box(&alternating)))
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mixed = make_mixed_chunk();
    let table = ControlTable::global();
    let held = HeldStates::new();
    let decoder = Decoder::new(table, &held);

    c.bench_function("decode_mixed_1k", |b| {
        b.iter(|| decoder.decode(black_box(&mixed)))
    });
}

criterion_group!(benches, bench_group_runs, bench_decode);
criterion_main!(benches);
