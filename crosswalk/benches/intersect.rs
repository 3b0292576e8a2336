//! Benchmarks pour le calcul des intersections et la chaîne complète

use std::sync::atomic::AtomicBool;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crosswalk::intersect::intersect;
use crosswalk::{
    build_crosswalk, AdministrativeUnit, Crs, CrosswalkConfig, Dataset, RawRecord, UnitCode,
    UnitRole, UnitSet,
};
use geo::{polygon, MultiPolygon};

fn rect(x0: f64, y0: f64, size: f64) -> MultiPolygon {
    MultiPolygon::new(vec![polygon![
        (x: x0, y: y0),
        (x: x0 + size, y: y0),
        (x: x0 + size, y: y0 + size),
        (x: x0, y: y0 + size),
        (x: x0, y: y0),
    ]])
}

/// Grille `n x n` de cellules carrées (mètres), décalée de `offset`
fn grid(n: usize, size: f64, offset: f64, prefix: u32) -> Vec<(String, MultiPolygon)> {
    (0..n * n)
        .map(|i| {
            let (row, col) = ((i / n) as f64, (i % n) as f64);
            let code = format!("{:02}{:03}", prefix, i % 1000);
            (code, rect(col * size + offset, row * size + offset, size))
        })
        .collect()
}

fn unit_set(role: UnitRole, cells: &[(String, MultiPolygon)]) -> UnitSet {
    UnitSet {
        role,
        crs: Crs::new(6933),
        units: cells
            .iter()
            .map(|(code, geometry)| {
                AdministrativeUnit::new(UnitCode::parse(code).unwrap(), geometry.clone())
            })
            .collect(),
    }
}

fn bench_intersect(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersect");

    for n in [10usize, 30] {
        let reference = unit_set(UnitRole::Reference, &grid(n, 2000.0, 0.0, 1));
        let target = unit_set(UnitRole::Target, &grid(n, 2500.0, -700.0, 2));
        let cancel = AtomicBool::new(false);
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_with_input(BenchmarkId::new("sequential", n), &n, |b, _| {
            b.iter(|| {
                let outcome = intersect(black_box(&reference), &target, false, &cancel).unwrap();
                black_box(outcome.candidate_pairs)
            })
        });

        group.bench_with_input(BenchmarkId::new("parallel", n), &n, |b, _| {
            b.iter(|| {
                let outcome = intersect(black_box(&reference), &target, true, &cancel).unwrap();
                black_box(outcome.candidate_pairs)
            })
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let records = |cells: Vec<(String, MultiPolygon)>| -> Vec<RawRecord> {
        cells
            .into_iter()
            .map(|(code, geometry)| RawRecord {
                code: Some(code.clone()),
                prefecture: "北海道".to_string(),
                city: code,
                district: None,
                geometry,
            })
            .collect()
    };

    let reference = Dataset::new(2000, Crs::new(6933), records(grid(20, 2000.0, 0.0, 1)));
    let target = Dataset::new(1980, Crs::new(6933), records(grid(20, 2500.0, -700.0, 2)));
    let config = CrosswalkConfig::default();

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    group.bench_function("grid_20", |b| {
        b.iter(|| {
            let crosswalk = build_crosswalk(black_box(&reference), &target, &config).unwrap();
            black_box(crosswalk.rows.len())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_intersect, bench_pipeline);
criterion_main!(benches);
