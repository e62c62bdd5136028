use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;

use qchannels::channels::catalog::{amplitude_damping_channel, bit_flip_channel};
use qchannels::channels::{
    apply_channel, channel_scalar_multiply, choi_representation, compose_channels, n_channel_uses,
    random_cp_map, random_quantum_channel, tensor_channels, RepresentationKind,
};
use qchannels::error::ErrorKind;
use qchannels::linalg::{identity, kron, Matrix};
use qchannels::states::random_density_matrix;

fn matrix_approx_eq(a: &Matrix, b: &Matrix, epsilon: f64) -> bool {
    a.dim() == b.dim() && a.iter().zip(b.iter()).all(|(x, y)| (x - y).norm() < epsilon)
}

fn channel(da: usize, db: usize, rng: &mut StdRng) -> Vec<Matrix> {
    random_quantum_channel(da, db, false, RepresentationKind::Kraus, rng)
        .unwrap()
        .into_kraus()
        .unwrap()
}

#[test]
fn test_composition_is_associative() {
    let mut rng = StdRng::seed_from_u64(2024);
    let k1 = channel(2, 2, &mut rng);
    let k2 = amplitude_damping_channel(0.3).unwrap();
    let k3 = channel(2, 2, &mut rng);

    let left = compose_channels(&[k1.clone(), compose_channels(&[k2.clone(), k3.clone()]).unwrap()]).unwrap();
    let right = compose_channels(&[compose_channels(&[k1, k2]).unwrap(), k3]).unwrap();

    for _ in 0..3 {
        let rho = random_density_matrix(2, &mut rng);
        let a = apply_channel(&left, &rho, None, false).unwrap();
        let b = apply_channel(&right, &rho, None, false).unwrap();
        assert!(matrix_approx_eq(&a, &b, 1e-10));
    }
}

#[test]
fn test_composition_applies_first_channel_first() {
    let mut rng = StdRng::seed_from_u64(7);
    let first = channel(2, 3, &mut rng);
    let second = channel(3, 2, &mut rng);
    let composed = compose_channels(&[first.clone(), second.clone()]).unwrap();

    assert_eq!(composed.len(), first.len() * second.len());
    assert!(composed.iter().all(|k| k.dim() == (2, 2)));

    let rho = random_density_matrix(2, &mut rng);
    let stepwise = apply_channel(&second, &apply_channel(&first, &rho, None, false).unwrap(), None, false).unwrap();
    let direct = apply_channel(&composed, &rho, None, false).unwrap();
    assert!(matrix_approx_eq(&stepwise, &direct, 1e-10));
}

#[test]
fn test_composition_rejects_broken_chain() {
    let mut rng = StdRng::seed_from_u64(9);
    let first = channel(2, 3, &mut rng);
    let err = compose_channels(&[first, identity_channel(2)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
}

fn identity_channel(d: usize) -> Vec<Matrix> {
    vec![identity(d)]
}

#[test]
fn test_tensor_power_cardinality() {
    let mut rng = StdRng::seed_from_u64(13);
    let kraus = random_cp_map(2, 3, false, false, RepresentationKind::Kraus, &mut rng)
        .unwrap()
        .into_kraus()
        .unwrap();

    for n in 1..=3 {
        let uses = n_channel_uses(&kraus, n).unwrap();
        println!("n = {}: {} operators", n, uses.len());
        assert_eq!(uses.len(), kraus.len().pow(n as u32));
        assert!(uses.iter().all(|k| k.dim() == (3usize.pow(n as u32), 2usize.pow(n as u32))));
    }
}

#[test]
fn test_tensor_acts_on_product_states() {
    let mut rng = StdRng::seed_from_u64(31);
    let flip = bit_flip_channel(0.2).unwrap().kraus;
    let damp = amplitude_damping_channel(0.5).unwrap();
    let both = tensor_channels(&[flip.clone(), damp.clone()]).unwrap();

    let rho = random_density_matrix(2, &mut rng);
    let sigma = random_density_matrix(2, &mut rng);
    let joint = apply_channel(&both, &kron(&rho, &sigma), None, false).unwrap();
    let separate = kron(
        &apply_channel(&flip, &rho, None, false).unwrap(),
        &apply_channel(&damp, &sigma, None, false).unwrap(),
    );
    assert!(matrix_approx_eq(&joint, &separate, 1e-12));
}

#[test]
fn test_scalar_multiple_scales_choi() {
    let damp = amplitude_damping_channel(0.4).unwrap();
    let scaled = channel_scalar_multiply(&damp, 2.5).unwrap();

    let choi = choi_representation(&damp, 2).unwrap();
    let scaled_choi = choi_representation(&scaled, 2).unwrap();
    assert!(matrix_approx_eq(&scaled_choi, &choi.mapv(|z| z * Complex64::new(2.5, 0.0)), 1e-12));

    assert_eq!(
        channel_scalar_multiply(&damp, -0.5).unwrap_err().kind(),
        ErrorKind::InvalidMap
    );
}
