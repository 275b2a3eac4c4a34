//! Criterion benchmarks for SignalForge hot paths.
//!
//! Benchmarks:
//! 1. Indicator snapshot (RSI, MACD, SMA, Bollinger, levels)
//! 2. Random forest training on lagged features
//! 3. Full analysis, cold and with a warm model cache

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use signalforge_core::config::AnalysisConfig;
use signalforge_core::domain::PriceSeries;
use signalforge_core::forecast::{FeatureSet, InMemoryModelCache, RandomForest};
use signalforge_core::indicators::{IndicatorSnapshot, PriceLevels};
use signalforge_core::Analyzer;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(n: usize) -> PriceSeries {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + 0.05 * i as f64 + (i as f64 * 0.1).sin() * 10.0)
        .collect();
    PriceSeries::from_closes(start, Duration::days(1), &closes).unwrap()
}

// ── 1. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("indicators");
    for n in [100, 1_000, 10_000] {
        let series = make_series(n);
        let closes = series.closes();
        group.bench_with_input(BenchmarkId::new("snapshot", n), &series, |b, s| {
            b.iter(|| IndicatorSnapshot::compute(black_box(s), &config))
        });
        group.bench_with_input(BenchmarkId::new("levels", n), &closes, |b, closes| {
            b.iter(|| {
                PriceLevels::compute(
                    black_box(closes),
                    series.current_price(),
                    &config.indicators,
                )
            })
        });
    }
    group.finish();
}

// ── 2. Forest Training ───────────────────────────────────────────────

fn bench_forest(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut group = c.benchmark_group("forest");
    group.sample_size(20);
    for n in [100, 500] {
        let closes = make_series(n).closes();
        let features = FeatureSet::build(
            &closes,
            config.forecast_horizon,
            config.forecast.feature_window,
            config.macd_fast,
            config.macd_slow,
        );
        group.bench_with_input(BenchmarkId::new("fit", n), &features, |b, f| {
            b.iter(|| {
                RandomForest::fit(
                    black_box(f),
                    &config.forecast.forest,
                    config.forecast.min_training_rows,
                )
            })
        });
    }
    group.finish();
}

// ── 3. Full Analysis ─────────────────────────────────────────────────

fn bench_analyze(c: &mut Criterion) {
    let series = make_series(365);
    let mut group = c.benchmark_group("analyze");
    group.sample_size(20);

    let cold = Analyzer::new(AnalysisConfig::default()).unwrap();
    group.bench_function("cold_365", |b| {
        b.iter(|| cold.analyze("BENCH", black_box(&series)).unwrap())
    });

    let warm = Analyzer::new(AnalysisConfig::default())
        .unwrap()
        .with_cache(Arc::new(InMemoryModelCache::new()));
    warm.analyze("BENCH", &series).unwrap();
    group.bench_function("warm_365", |b| {
        b.iter(|| warm.analyze("BENCH", black_box(&series)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_indicators, bench_forest, bench_analyze);
criterion_main!(benches);
