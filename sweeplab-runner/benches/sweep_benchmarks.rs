//! Criterion benchmarks for the sweep hot loops.
//!
//! Run with: `cargo bench -p sweeplab-runner`
//!
//! - Multi-window aggregation for one (symbol, combination)
//! - One combination across several symbols
//! - Grid expansion

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sweeplab_core::data::{PriceProvider, SyntheticProvider};
use sweeplab_core::domain::PriceSeries;
use sweeplab_core::signals::IndicatorKind;
use sweeplab_runner::{evaluate_combination, evaluate_symbol, EvaluationSettings, ParamAxis, ParamGrid};

fn series(symbol: &str, n: usize) -> PriceSeries {
    SyntheticProvider::new(42, n).load(symbol).expect("synthetic series")
}

fn bench_evaluate_symbol(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_symbol");
    let settings = EvaluationSettings::default();

    for n in [1_000, 3_000, 10_000] {
        let prices = series("BENCH", n);
        for kind in IndicatorKind::ALL {
            let handler = kind.build(&kind.default_params()).expect("default params");
            group.bench_with_input(
                BenchmarkId::new(kind.as_str(), n),
                &prices,
                |b, p| {
                    b.iter(|| {
                        let _ = evaluate_symbol(black_box(p), handler.as_ref(), &settings);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_evaluate_combination(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_combination");
    let settings = EvaluationSettings::default();
    let params = IndicatorKind::Rsi.default_params();

    for symbols in [1, 4, 16] {
        let universe: Vec<PriceSeries> = (0..symbols)
            .map(|i| series(&format!("S{i}"), 2_000))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(symbols), &universe, |b, u| {
            b.iter(|| evaluate_combination(IndicatorKind::Rsi, &params, black_box(u), &settings, None));
        });
    }

    group.finish();
}

fn bench_grid_expansion(c: &mut Criterion) {
    let grid = ParamGrid::new()
        .with_axis("length", ParamAxis::Range { start: 5.0, end: 50.0, step: 1.0 })
        .with_axis("bl", ParamAxis::Range { start: 10.0, end: 40.0, step: 2.5 })
        .with_axis("bu", ParamAxis::Range { start: 60.0, end: 90.0, step: 2.5 });

    c.bench_function("grid_combinations", |b| {
        b.iter(|| black_box(&grid).combinations().expect("valid grid"));
    });
}

criterion_group!(
    benches,
    bench_evaluate_symbol,
    bench_evaluate_combination,
    bench_grid_expansion
);
criterion_main!(benches);
