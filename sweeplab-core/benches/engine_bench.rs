//! Criterion benchmarks for SweepLab engine hot paths.
//!
//! Benchmarks:
//! 1. Signal computation per indicator family
//! 2. Position derivation
//! 3. Return accumulation over a resolved span

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sweeplab_core::data::{PriceProvider, SyntheticProvider};
use sweeplab_core::domain::{leading_unknown, PriceSeries};
use sweeplab_core::engine::{accumulate, derive_positions, DEFAULT_FEE};
use sweeplab_core::signals::IndicatorKind;

fn series(n: usize) -> PriceSeries {
    SyntheticProvider::new(42, n)
        .load("BENCH")
        .expect("synthetic series")
}

fn bench_signals(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_compute");
    let prices = series(2_000);
    for kind in IndicatorKind::ALL {
        let handler = kind.build(&kind.default_params()).expect("default params");
        group.bench_with_input(BenchmarkId::from_parameter(kind), &prices, |b, p| {
            b.iter(|| handler.compute(black_box(p)).expect("compute"));
        });
    }
    group.finish();
}

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_positions");
    for n in [500, 2_000, 10_000] {
        let prices = series(n);
        let frame = IndicatorKind::Rsi
            .build(&IndicatorKind::Rsi.default_params())
            .expect("default params")
            .compute(&prices)
            .expect("compute");
        group.bench_with_input(BenchmarkId::from_parameter(n), &frame, |b, f| {
            b.iter(|| derive_positions(black_box(f)).expect("derive"));
        });
    }
    group.finish();
}

fn bench_accumulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulate");
    for n in [500, 2_000, 10_000] {
        let prices = series(n);
        let frame = IndicatorKind::Bollinger
            .build(&IndicatorKind::Bollinger.default_params())
            .expect("default params")
            .compute(&prices)
            .expect("compute");
        let positions = derive_positions(&frame).expect("derive");
        let cut = leading_unknown(&positions);
        let closes = prices.closes()[cut..].to_vec();
        let resolved = positions[cut..].to_vec();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| accumulate(black_box(&closes), black_box(&resolved), DEFAULT_FEE));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_signals, bench_derive, bench_accumulate);
criterion_main!(benches);
