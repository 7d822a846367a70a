use criterion::{criterion_group, criterion_main, Criterion};
use haloconv_kernels::{cpu_conv2d_rows, cpu_conv2d_serial, ConvGeometry, InputSlice, Schedule};
use std::hint::black_box;
use std::num::NonZeroUsize;

fn benchmark_conv2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("conv2d");
    let sizes = [128, 512, 1024];

    for &size in &sizes {
        let geometry = ConvGeometry::new([size, size], [3, 3], [1, 1]).unwrap();
        let input = vec![1.0f32; size * size];
        let kernel = vec![1.0f32 / 9.0; 9];
        let mut out = vec![0.0f32; geometry.out_h() * geometry.out_w()];

        group.bench_function(format!("serial/{}x{}", size, size), |b| {
            b.iter(|| {
                cpu_conv2d_serial(black_box(&input), black_box(&kernel), &geometry).unwrap()
            })
        });

        let slice = InputSlice::whole(&input, size).unwrap();
        let schedules = [
            ("auto", Schedule::Auto),
            ("rows1", Schedule::Rows(NonZeroUsize::new(1).unwrap())),
            ("cells16", Schedule::Cells(NonZeroUsize::new(16).unwrap())),
        ];
        for (name, schedule) in schedules {
            group.bench_function(format!("{}/{}x{}", name, size, size), |b| {
                b.iter(|| {
                    cpu_conv2d_rows(
                        black_box(&slice),
                        black_box(&kernel),
                        &geometry,
                        0..geometry.out_h(),
                        schedule,
                        &mut out,
                    )
                    .unwrap()
                })
            });
        }
    }
    group.finish();
}

fn benchmark_kernel_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_size");
    let size = 512;
    let input = vec![0.5f32; size * size];
    let slice = InputSlice::whole(&input, size).unwrap();

    for &k in &[3, 5, 7, 11] {
        let geometry = ConvGeometry::new([size, size], [k, k], [1, 1]).unwrap();
        let kernel = vec![1.0f32; k * k];
        let mut out = vec![0.0f32; geometry.out_h() * geometry.out_w()];

        group.bench_function(format!("{}x{}", k, k), |b| {
            b.iter(|| {
                cpu_conv2d_rows(
                    &slice,
                    black_box(&kernel),
                    &geometry,
                    0..geometry.out_h(),
                    Schedule::Auto,
                    &mut out,
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_conv2d, benchmark_kernel_size);
criterion_main!(benches);
