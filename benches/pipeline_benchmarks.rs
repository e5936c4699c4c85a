use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use matte_refine::{
    config::{ChromaPreset, MorphOp},
    pipeline::{refine_blocking, JobContext},
    ssaa,
    stages::feather,
    PixelBuffer, ProgressTracker, RefinementParameters, RefinementService, ServiceConfig,
};
use tokio::runtime::Runtime;

/// Green screen with a skin-toned disc in the middle
fn keyed_frame(width: u32, height: u32) -> PixelBuffer {
    let mut buffer = PixelBuffer::filled(width, height, [0, 255, 0, 255]).unwrap();
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let radius = width.min(height) as f32 / 3.0;
    let bytes = buffer.as_bytes_mut();
    for y in 0..height {
        for x in 0..width {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            if d < radius {
                let i = ((y * width + x) * 4) as usize;
                bytes[i..i + 3].copy_from_slice(&[210, 160, 120]);
            }
        }
    }
    buffer
}

fn production_params() -> RefinementParameters {
    RefinementParameters::builder()
        .chroma_preset(ChromaPreset::Green)
        .chroma_tolerance(60.0)
        .edge_choke(-1)
        .feather_radius(3)
        .morph_op(MorphOp::Erode)
        .morph_iter(1)
        .decontamination_strength(80.0)
        .build()
        .unwrap()
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    for size in [256u32, 512] {
        let frame = keyed_frame(size, size);
        let params = production_params();
        group.bench_with_input(BenchmarkId::new("refine_blocking", size), &frame, |b, frame| {
            b.iter(|| refine_blocking(black_box(frame.clone()), &params).unwrap());
        });
    }

    group.finish();
}

fn bench_feather_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("feather");
    group.sample_size(10);
    let frame = keyed_frame(512, 512);

    // 15 is the last Gaussian radius, 16 the first box radius
    for radius in [3u32, 15, 16, 30] {
        group.bench_with_input(BenchmarkId::from_parameter(radius), &radius, |b, &radius| {
            b.iter(|| {
                let mut buffer = frame.clone();
                feather::apply(&mut buffer, radius, &mut JobContext::detached()).unwrap();
                black_box(buffer)
            });
        });
    }

    group.finish();
}

fn bench_worker_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = RefinementService::create(
        ServiceConfig::builder().ssaa_factor(2).build().unwrap(),
    )
    .unwrap();
    let frame = keyed_frame(512, 512);
    let params = production_params();

    c.bench_function("worker_round_trip_ssaa2_512", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut tracker = ProgressTracker::no_op();
                service
                    .refine(frame.clone(), params.clone(), &mut tracker)
                    .await
                    .unwrap()
            })
        });
    });
}

fn bench_ssaa(c: &mut Criterion) {
    let frame = keyed_frame(1024, 1024);
    c.bench_function("ssaa_downsample_4x_1024", |b| {
        b.iter(|| ssaa::downsample(black_box(frame.clone()), 4).unwrap());
    });
}

criterion_group!(
    benches,
    bench_pipeline,
    bench_feather_kernels,
    bench_worker_round_trip,
    bench_ssaa
);
criterion_main!(benches);
