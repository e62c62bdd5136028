use ndarray::array;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;

use qchannels::channels::catalog::{amplitude_damping_channel, depolarizing_channel};
use qchannels::channels::{
    apply_channel, random_quantum_channel, tensor_channels, RepresentationKind, Subsystems,
};
use qchannels::error::{ChannelError, ErrorKind};
use qchannels::linalg::{identity, kron, trace, Matrix};
use qchannels::states::random_density_matrix;

/// Helper function for comparing complex numbers with tolerance
fn complex_approx_eq(a: Complex64, b: Complex64, epsilon: f64) -> bool {
    (a - b).norm() < epsilon
}

fn matrix_approx_eq(a: &Matrix, b: &Matrix, epsilon: f64) -> bool {
    a.dim() == b.dim() && a.iter().zip(b.iter()).all(|(x, y)| complex_approx_eq(*x, *y, epsilon))
}

fn c(re: f64) -> Complex64 {
    Complex64::new(re, 0.0)
}

fn random_kraus(d: usize, seed: u64) -> Vec<Matrix> {
    let mut rng = StdRng::seed_from_u64(seed);
    random_quantum_channel(d, d, false, RepresentationKind::Kraus, &mut rng)
        .unwrap()
        .into_kraus()
        .unwrap()
}

#[test]
fn test_depolarizing_on_ground_state() {
    let p = 0.3;
    let channel = depolarizing_channel(p).unwrap();
    let ground = array![[c(1.0), c(0.0)], [c(0.0), c(0.0)]];

    let out = apply_channel(&channel.kraus, &ground, None, false).unwrap();
    println!("Depolarized |0⟩⟨0|: {:?}", out);

    let expected = ground.mapv(|z| z * (1.0 - p)) + identity(2).mapv(|z| z * (p / 2.0));
    assert!(complex_approx_eq(trace(&out), c(1.0), 1e-12));
    assert!(matrix_approx_eq(&out, &expected, 1e-12));
}

#[test]
fn test_channels_preserve_trace() {
    let mut rng = StdRng::seed_from_u64(17);
    for d in 2..=4 {
        let kraus = random_kraus(d, d as u64);
        for _ in 0..3 {
            let rho = random_density_matrix(d, &mut rng);
            let out = apply_channel(&kraus, &rho, None, false).unwrap();
            assert!(complex_approx_eq(trace(&out), c(1.0), 1e-10));
        }
    }
}

#[test]
fn test_partial_application_matches_tensor_with_identity() {
    let mut rng = StdRng::seed_from_u64(99);
    let cases = vec![(amplitude_damping_channel(0.4).unwrap(), 2), (random_kraus(3, 5), 3)];

    for (kraus, d) in cases {
        let rho = random_density_matrix(d * d, &mut rng);
        let partial = apply_channel(&kraus, &rho, Some(Subsystems::new(&[2], &[d, d])), false).unwrap();
        let extended = tensor_channels(&[vec![identity(d)], kraus.clone()]).unwrap();
        let full = apply_channel(&extended, &rho, None, false).unwrap();
        assert!(matrix_approx_eq(&partial, &full, 1e-10));
    }
}

#[test]
fn test_application_on_several_subsystems() {
    let mut rng = StdRng::seed_from_u64(3);
    let kraus = amplitude_damping_channel(0.7).unwrap();
    let rho = random_density_matrix(8, &mut rng);

    let selected = apply_channel(&kraus, &rho, Some(Subsystems::new(&[1, 3], &[2, 2, 2])), false).unwrap();
    let extended = tensor_channels(&[kraus.clone(), vec![identity(2)], kraus.clone()]).unwrap();
    let full = apply_channel(&extended, &rho, None, false).unwrap();

    assert!(matrix_approx_eq(&selected, &full, 1e-10));
}

#[test]
fn test_rectangular_map_on_subsystem() {
    let mut rng = StdRng::seed_from_u64(41);
    let kraus = random_quantum_channel(2, 3, false, RepresentationKind::Kraus, &mut rng)
        .unwrap()
        .into_kraus()
        .unwrap();
    let rho = kron(&random_density_matrix(2, &mut rng), &random_density_matrix(2, &mut rng));

    let out = apply_channel(&kraus, &rho, Some(Subsystems::new(&[1], &[2, 2])), false).unwrap();
    assert_eq!(out.dim(), (6, 6));
    assert!(complex_approx_eq(trace(&out), c(1.0), 1e-10));
}

#[test]
fn test_adjoint_is_dual_map() {
    let mut rng = StdRng::seed_from_u64(64);
    let kraus = random_kraus(3, 11);
    let rho = random_density_matrix(3, &mut rng);
    let sigma = random_density_matrix(3, &mut rng);

    let lhs = trace(&apply_channel(&kraus, &rho, None, false).unwrap().dot(&sigma));
    let rhs = trace(&rho.dot(&apply_channel(&kraus, &sigma, None, true).unwrap()));
    assert!(complex_approx_eq(lhs, rhs, 1e-10));

    // the adjoint of a channel is unital
    let unit = apply_channel(&kraus, &identity(3), None, true).unwrap();
    assert!(matrix_approx_eq(&unit, &identity(3), 1e-10));
}

#[test]
fn test_application_errors() {
    let rho = identity(4);
    let err = apply_channel(&[], &rho, None, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMap);

    let err = apply_channel(&[identity(2)], &rho, Some(Subsystems::new(&[], &[2, 2])), false).unwrap_err();
    assert!(matches!(err, ChannelError::InvalidSubsystems(_)));

    let err = apply_channel(&[identity(2)], &rho, Some(Subsystems::new(&[1, 1], &[2, 2])), false).unwrap_err();
    assert!(matches!(err, ChannelError::InvalidSubsystems(_)));

    let err = apply_channel(&[identity(2)], &rho, Some(Subsystems::new(&[1], &[2, 3])), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
}
