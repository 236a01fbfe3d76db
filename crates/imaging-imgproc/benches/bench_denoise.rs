use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use imaging_image::Image;
use imaging_imgproc::denoise::{
    median_filter, vector_median_filter, vector_median_filter_dual, VectorMedianConfig, VmfPolicy,
};
use imaging_imgproc::parallel::ExecutionStrategy;

fn bench_vector_median(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector_median");

    for (width, height) in [(256, 224), (512, 448)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let parameter_string = format!("{}x{}", width, height);

        // input image
        let image_size = [*width, *height].into();
        let data = (0..width * height * 3).map(|i| (i % 251) as f32).collect();
        let image = Image::<f32, 3>::new(image_size, data).unwrap();
        let output = Image::<f32, 3>::from_size_val(image_size, 0.0).unwrap();

        for (name, strategy) in [
            ("serial", ExecutionStrategy::Serial),
            ("parallel_rows", ExecutionStrategy::ParallelRows),
        ] {
            for policy in [VmfPolicy::VectorMedian, VmfPolicy::AlphaTrimmedMean] {
                let config = VectorMedianConfig {
                    policy,
                    strategy,
                    ..Default::default()
                };
                group.bench_with_input(
                    BenchmarkId::new(format!("{policy:?}_{name}"), &parameter_string),
                    &(&image, &output),
                    |b, i| {
                        let (src, mut dst) = (i.0, i.1.clone());
                        b.iter(|| black_box(vector_median_filter(src, &mut dst, &config)))
                    },
                );
            }
        }

        group.bench_with_input(
            BenchmarkId::new("dual_pooled", &parameter_string),
            &(&image, &output),
            |b, i| {
                let (src, mut dst) = (i.0, i.1.clone());
                let config = VectorMedianConfig::default();
                b.iter(|| black_box(vector_median_filter_dual(src, src, &mut dst, &config)))
            },
        );
    }
    group.finish();
}

fn bench_median(c: &mut Criterion) {
    let mut group = c.benchmark_group("median");

    for (width, height) in [(256, 224), (512, 448), (1024, 896)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let parameter_string = format!("{}x{}", width, height);

        let image_size = [*width, *height].into();
        let data = (0..width * height).map(|i| (i % 251) as f32).collect();
        let image = Image::<f32, 1>::new(image_size, data).unwrap();
        let output = Image::<f32, 1>::from_size_val(image_size, 0.0).unwrap();

        group.bench_with_input(
            BenchmarkId::new("median_3x3", &parameter_string),
            &(&image, &output),
            |b, i| {
                let (src, mut dst) = (i.0, i.1.clone());
                b.iter(|| {
                    black_box(median_filter(
                        src,
                        &mut dst,
                        1,
                        ExecutionStrategy::ParallelRows,
                    ))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_vector_median, bench_median);
criterion_main!(benches);
