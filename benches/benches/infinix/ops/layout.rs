use criterion::{black_box, Criterion};
use infinix_core::layout::{compute_contiguous_stride, storage_size};

pub fn basic(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("layout/basic");
    group.warm_up_time(core::time::Duration::from_millis(500));
    group.measurement_time(core::time::Duration::from_secs(3));

    let shape = [8usize, 16, 32, 64];
    let contiguous = compute_contiguous_stride(&shape);
    let mixed = [-2048isize, 64, -1, 2];

    group.bench_function("storage_size/contiguous", |b| {
        b.iter(|| storage_size(black_box(&shape), black_box(&contiguous)))
    });
    group.bench_function("storage_size/mixed_signs", |b| {
        b.iter(|| storage_size(black_box(&shape), black_box(&mixed)))
    });

    group.finish();
}
