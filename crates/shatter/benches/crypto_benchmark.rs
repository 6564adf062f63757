use antigravity_shatter::ShatterEngine;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

fn bench_shatter(c: &mut Criterion) {
    let mut group = c.benchmark_group("shatter_split");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let sizes = [256 * 1024, 2 * 1024 * 1024];

    for &size in &sizes {
        let payload = vec![0x3Cu8; size];
        group.bench_with_input(BenchmarkId::new("shatter", size), &payload, |b, payload| {
            b.iter(|| {
                let dir = tempdir().unwrap();
                let file_path = dir.path().join("input.bin");
                fs::write(&file_path, payload).unwrap();
                let engine = ShatterEngine::default();
                black_box(engine.shatter(&file_path, "benchmark-pw", None, false, None).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_reassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("shatter_reassemble");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let payload = vec![0x5Au8; 2 * 1024 * 1024];

    group.bench_function("shatter_then_reassemble", |b| {
        b.iter(|| {
            let dir = tempdir().unwrap();
            let file_path = dir.path().join("input.bin");
            fs::write(&file_path, &payload).unwrap();
            let engine = ShatterEngine::default();
            let sharded_dir = engine.shatter(&file_path, "benchmark-pw", None, true, None).unwrap();
            let manifest_path = sharded_dir.join(format!("input.bin{}", antigravity_shatter::MANIFEST_EXT));
            black_box(engine.reassemble(&manifest_path, "benchmark-pw", None, false, None).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_shatter, bench_reassemble);
criterion_main!(benches);
