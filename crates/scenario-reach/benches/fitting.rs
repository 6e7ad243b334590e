use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;
use scenario_reach::{binomial_tail, PointSet, ScenarioCertifier};

fn cloud(count: usize, seed: u64) -> PointSet {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let rows: Vec<[f64; 2]> = (0..count)
        .map(|_| {
            let x: f64 = StandardNormal.sample(&mut rng);
            let y: f64 = StandardNormal.sample(&mut rng);
            [x + 0.5 * y, y]
        })
        .collect();
    PointSet::from_rows(&rows).expect("finite samples")
}

fn bench_fitting(c: &mut Criterion) {
    let training = cloud(500, 1);
    let test = cloud(1500, 2);

    let mut group = c.benchmark_group("scenario_reach");
    group.sample_size(10);

    group.bench_function("binomial_tail", |b| {
        b.iter(|| black_box(binomial_tail(black_box(8), black_box(1500))))
    });

    group.bench_function("ellipsoid_l2", |b| {
        b.iter(|| {
            let certificate = ScenarioCertifier::new().certify_ellipsoid(&training, &test);
            black_box(certificate.map(|c| c.coverage.epsilon))
        });
    });

    group.bench_function("zonotope_quick", |b| {
        b.iter(|| {
            let fit = ScenarioCertifier::quick()
                .active_set_size(50)
                .fit_zonotope(&training, None);
            black_box(fit.map(|f| f.objective))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_fitting);
criterion_main!(benches);
