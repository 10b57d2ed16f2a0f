use bpsim::math::stable::{pdf, AlphaStableNoise};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn bench_table_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("stable_table");
    group.sample_size(10);
    for alpha in [1.2, 1.8].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(alpha), alpha, |b, &alpha| {
            b.iter(|| AlphaStableNoise::new(black_box(alpha)).unwrap())
        });
    }
    group.finish();
}

fn bench_density(c: &mut Criterion) {
    let noise = AlphaStableNoise::new(1.5).unwrap();
    c.bench_function("table_density", |b| {
        b.iter(|| noise.density(black_box(3.7), black_box(0.8)))
    });
    c.bench_function("exact_density", |b| {
        b.iter(|| pdf::standard_density(black_box(3.7), black_box(1.5)))
    });
}

fn bench_sampling(c: &mut Criterion) {
    let noise = AlphaStableNoise::new(1.5).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    c.bench_function("sample_1024", |b| b.iter(|| noise.samples(&mut rng, 1.0, 1024)));
}

criterion_group!(benches, bench_table_construction, bench_density, bench_sampling);
criterion_main!(benches);
