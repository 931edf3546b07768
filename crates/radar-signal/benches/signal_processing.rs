//! Benchmarks for feature extraction and grid flushing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use radar_core::ObservationRecord;
use radar_signal::features::FeatureExtractor;
use radar_signal::spatial::{GridConfig, SpatialGrid};

fn create_test_batch(n_records: usize) -> Vec<ObservationRecord> {
    (0..n_records)
        .map(|i| {
            let strength = -50.0 + 4.0 * (i as f64 * 0.37).sin();
            ObservationRecord::new(i as f64 * 0.01).with_signal_strength(strength)
        })
        .collect()
}

fn benchmark_extraction(c: &mut Criterion) {
    let small = create_test_batch(30);
    let large = create_test_batch(1000);

    c.bench_function("extract_features_30", |b| {
        let mut extractor = FeatureExtractor::new();
        b.iter(|| extractor.extract_features(black_box(&small)))
    });

    c.bench_function("extract_features_1000", |b| {
        let mut extractor = FeatureExtractor::new();
        b.iter(|| extractor.extract_features(black_box(&large)))
    });
}

fn benchmark_grid_flush(c: &mut Criterion) {
    c.bench_function("grid_flush_10x10", |b| {
        let mut grid = SpatialGrid::seeded(GridConfig::default(), 1, 0.0).unwrap();
        let mut now = 0.0;
        b.iter(|| {
            now += 1.0;
            grid.update(black_box(0.7), now)
        })
    });

    c.bench_function("grid_flush_64x64", |b| {
        let mut grid = SpatialGrid::seeded(GridConfig::new(64, 64, 1.0, true), 1, 0.0).unwrap();
        let mut now = 0.0;
        b.iter(|| {
            now += 1.0;
            grid.update(black_box(0.7), now)
        })
    });
}

criterion_group!(benches, benchmark_extraction, benchmark_grid_flush);
criterion_main!(benches);
