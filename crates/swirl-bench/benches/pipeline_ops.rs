//! Criterion benchmarks for whole pipeline steps.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use swirl_bench::{ready_pipeline, reference_profile, stress_profile};
use swirl_device::SyncMode;

/// Benchmark: one full step (simulate, rasterize, encode) at 256x192.
fn bench_step_reference(c: &mut Criterion) {
    let mut pipeline = ready_pipeline(&reference_profile(42));

    c.bench_function("step_reference_256x192", |b| {
        b.iter(|| {
            let frame = pipeline.step().unwrap();
            black_box(frame.len());
        });
    });

    pipeline.cleanup().unwrap();
}

/// Benchmark: the same step with strict synchronization, to price the
/// per-dispatch wait.
fn bench_step_reference_strict(c: &mut Criterion) {
    let mut profile = reference_profile(42);
    profile.config.sync = SyncMode::Strict;
    let mut pipeline = ready_pipeline(&profile);

    c.bench_function("step_reference_strict", |b| {
        b.iter(|| {
            let frame = pipeline.step().unwrap();
            black_box(frame.len());
        });
    });

    pipeline.cleanup().unwrap();
}

/// Benchmark: one full step at 1024x768.
fn bench_step_stress(c: &mut Criterion) {
    let mut pipeline = ready_pipeline(&stress_profile(42));

    let mut group = c.benchmark_group("stress");
    group.sample_size(10);
    group.bench_function("step_stress_1024x768", |b| {
        b.iter(|| {
            let frame = pipeline.step().unwrap();
            black_box(frame.len());
        });
    });
    group.finish();

    pipeline.cleanup().unwrap();
}

/// Benchmark: rendering a larger camera than the grid.
fn bench_step_upscaled(c: &mut Criterion) {
    let mut pipeline = ready_pipeline(&reference_profile(7));
    pipeline.update_camera(1024, 768, 75).unwrap();

    c.bench_function("step_reference_to_1024x768", |b| {
        b.iter(|| {
            let frame = pipeline.step().unwrap();
            black_box(frame.len());
        });
    });

    pipeline.cleanup().unwrap();
}

criterion_group!(
    benches,
    bench_step_reference,
    bench_step_reference_strict,
    bench_step_stress,
    bench_step_upscaled,
);
criterion_main!(benches);
