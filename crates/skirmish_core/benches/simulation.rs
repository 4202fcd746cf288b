//! Simulation benchmarks for skirmish_core.
//!
//! Run with: `cargo bench -p skirmish_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use skirmish_core::math::{destination_angle, Fixed, Vec2Fixed};
use skirmish_core::movement::turn_toward;
use skirmish_test_utils::fixtures::skirmish;

/// Tick loop on armies of increasing size.
pub fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for per_side in [6usize, 24, 96] {
        group.bench_with_input(BenchmarkId::from_parameter(per_side), &per_side, |b, &n| {
            b.iter_batched(
                || skirmish(n),
                |mut sim| {
                    for _ in 0..10 {
                        black_box(sim.tick());
                    }
                    sim
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Save and hash, the per-frame cost of desync checks and autosaves.
pub fn snapshot_benchmark(c: &mut Criterion) {
    let mut sim = skirmish(48);
    for _ in 0..50 {
        sim.tick();
    }
    c.bench_function("state_hash", |b| b.iter(|| black_box(sim.state_hash())));
    c.bench_function("save", |b| b.iter(|| black_box(sim.save())));
}

/// Heading math used by every moving unit each tick.
pub fn steering_benchmark(c: &mut Criterion) {
    let from = Vec2Fixed::from_ints(100, 900);
    let to = Vec2Fixed::from_ints(1700, 40);
    c.bench_function("destination_angle", |b| {
        b.iter(|| destination_angle(black_box(from), black_box(to)))
    });
    c.bench_function("turn_toward", |b| {
        b.iter(|| {
            turn_toward(
                black_box(Fixed::from_num(3)),
                black_box(Fixed::from_num(200)),
                Fixed::from_num(10),
            )
        })
    });
}

criterion_group!(benches, tick_benchmark, snapshot_benchmark, steering_benchmark);
criterion_main!(benches);
