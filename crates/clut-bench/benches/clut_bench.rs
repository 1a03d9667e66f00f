//! Benchmarks for the CLUT engine.
//!
//! Run with: `cargo bench`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use clut_lut::{HaldClut, Kernel, Lut3D, Rgb16Image};
use clut_math::simd;
use clut_math::transfer::pq_shaper;
use clut_math::{ColorManagement, StandardProfiles};
use clut_store::ctl::Shaper;

const LINE: usize = 4096;

fn scanline() -> [Vec<f32>; 3] {
    let r: Vec<f32> = (0..LINE).map(|i| (i * 16) as f32 % 65535.0).collect();
    let g: Vec<f32> = r.iter().rev().copied().collect();
    let b: Vec<f32> = r.iter().map(|v| (v * 0.37 + 9000.0) % 65535.0).collect();
    [r, g, b]
}

/// Benchmark the Hald lookup kernels.
fn bench_hald(c: &mut Criterion) {
    let mut group = c.benchmark_group("hald");
    let [r, g, b] = scanline();
    let mut out = vec![0.0f32; LINE * 4];
    group.throughput(Throughput::Elements(LINE as u64));

    for level in [8u32, 12] {
        let clut = HaldClut::from_image(Rgb16Image::identity_hald(level), "bench.png", "sRGB")
            .expect("identity Hald image");

        for (name, kernel) in [("scalar", Kernel::Scalar), ("simd", Kernel::Simd)] {
            group.bench_with_input(BenchmarkId::new(name, level), &clut, |bench, clut| {
                bench.iter(|| clut.get_rgb(kernel, black_box(0.8), &r, &g, &b, &mut out))
            });
        }
    }

    group.finish();
}

/// Benchmark profile conversion of planar scanlines.
fn bench_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix");
    let cms = StandardProfiles::new();
    let m = cms.working_space_matrix("ProPhoto").expect("built-in profile");
    let [mut r, mut g, mut b] = scanline();
    let orig = r.clone();
    group.throughput(Throughput::Elements(LINE as u64));

    group.bench_function("transform_planar", |bench| {
        bench.iter(|| simd::transform_planar(black_box(&m), &mut r, &mut g, &mut b))
    });

    group.bench_function("blend_planar", |bench| {
        bench.iter(|| simd::blend_planar(black_box(0.5), &mut g, &orig))
    });

    group.finish();
}

/// Benchmark the CTL fast path: shaper and 3D table.
fn bench_fast_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("fast_path");
    let shaper = Shaper::new();
    let values: Vec<f32> = (0..LINE).map(|i| i as f32 / LINE as f32).collect();
    group.throughput(Throughput::Elements(LINE as u64));

    group.bench_function("pq_direct", |bench| {
        bench.iter(|| values.iter().map(|&v| pq_shaper(black_box(v), false)).collect::<Vec<_>>())
    });

    group.bench_function("pq_table", |bench| {
        bench.iter(|| values.iter().map(|&v| shaper.eval(black_box(v), false)).collect::<Vec<_>>())
    });

    for size in [24usize, 64] {
        let lut = Lut3D::identity(size);
        group.bench_with_input(BenchmarkId::new("lut3d", size), &lut, |bench, lut| {
            bench.iter(|| {
                values
                    .iter()
                    .map(|&v| lut.apply(black_box([v, 1.0 - v, v * 0.5])))
                    .collect::<Vec<_>>()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hald, bench_matrix, bench_fast_path);
criterion_main!(benches);
