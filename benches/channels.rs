use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;

use qchannels::channels::catalog::amplitude_damping_channel;
use qchannels::channels::{
    apply_channel, choi_representation, choi_to_kraus, n_channel_uses, random_quantum_channel,
    RepresentationKind, Subsystems,
};
use qchannels::optimize::diamond_norm;
use qchannels::states::random_density_matrix;

/// Benchmark Choi to Kraus conversion for growing dimensions
fn bench_choi_to_kraus(c: &mut Criterion) {
    let mut group = c.benchmark_group("choi_to_kraus");

    for d in [2usize, 3, 4, 6].iter() {
        let mut rng = StdRng::seed_from_u64(*d as u64);
        let choi = random_quantum_channel(*d, *d, false, RepresentationKind::Choi, &mut rng)
            .unwrap()
            .into_choi()
            .unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("random_channel", d), d, |b, &d| {
            b.iter(|| {
                let kraus = choi_to_kraus(black_box(&choi), d, d).unwrap();
                black_box(kraus);
            });
        });
    }

    group.finish();
}

/// Benchmark subsystem application, whose cost grows as |K|^k
fn bench_subsystem_application(c: &mut Criterion) {
    let mut group = c.benchmark_group("subsystem_application");
    let kraus = amplitude_damping_channel(0.2).unwrap();

    for qubits in [2usize, 3, 4].iter() {
        let mut rng = StdRng::seed_from_u64(11);
        let rho = random_density_matrix(1 << qubits, &mut rng);
        let dims = vec![2; *qubits];
        let targets: Vec<usize> = (1..=*qubits).collect();

        group.bench_with_input(BenchmarkId::new("all_qubits", qubits), qubits, |b, _| {
            b.iter(|| {
                let out = apply_channel(&kraus, black_box(&rho), Some(Subsystems::new(&targets, &dims)), false).unwrap();
                black_box(out);
            });
        });
    }

    group.finish();
}

/// Benchmark tensor powers of a channel
fn bench_n_channel_uses(c: &mut Criterion) {
    let mut group = c.benchmark_group("n_channel_uses");
    let kraus = amplitude_damping_channel(0.5).unwrap();

    for n in [1usize, 2, 3, 4].iter() {
        group.bench_with_input(BenchmarkId::new("amplitude_damping", n), n, |b, &n| {
            b.iter(|| black_box(n_channel_uses(&kraus, n).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark the diamond norm of a channel difference
fn bench_diamond_norm(c: &mut Criterion) {
    let mut group = c.benchmark_group("diamond_norm");
    group.sample_size(20);

    let id = choi_representation(&[qchannels::linalg::identity(2)], 2).unwrap();
    let damping = choi_representation(&amplitude_damping_channel(0.3).unwrap(), 2).unwrap();
    let difference = &id - &damping;

    group.bench_function("identity_minus_amplitude_damping", |b| {
        b.iter(|| black_box(diamond_norm(black_box(&difference), 2, 2).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_choi_to_kraus,
    bench_subsystem_application,
    bench_n_channel_uses,
    bench_diamond_norm
);
criterion_main!(benches);
