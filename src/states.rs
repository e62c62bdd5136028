//! Random quantum states
//!
//! Pure states are drawn from the unitarily invariant measure by
//! normalising a complex Gaussian vector; mixed states use the
//! Hilbert-Schmidt (Ginibre) ensemble.

use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::linalg::{c64, dagger, trace, Matrix, Vector};

fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> num_complex::Complex64 {
    let re: f64 = rng.sample(StandardNormal);
    let im: f64 = rng.sample(StandardNormal);
    c64(re, im)
}

/// Haar-random unit vector in `d` dimensions
///
/// The zero-dimensional space has no unit vector; `d = 0` yields an empty vector.
pub fn random_state_vector<R: Rng + ?Sized>(d: usize, rng: &mut R) -> Vector {
    if d == 0 {
        return Array1::zeros(0);
    }
    loop {
        let v: Vector = Array1::from_shape_fn(d, |_| gaussian(rng));
        let norm = v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
        if norm > f64::EPSILON {
            return v.mapv(|z| z / norm);
        }
    }
}

/// Random full-rank density matrix G G† / Tr(G G†)
pub fn random_density_matrix<R: Rng + ?Sized>(d: usize, rng: &mut R) -> Matrix {
    let g: Matrix = Array2::from_shape_fn((d, d), |_| gaussian(rng));
    let rho = g.dot(&dagger(&g));
    let norm = trace(&rho).re;
    rho.mapv(|z| z / norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{is_hermitian, min_eigenvalue};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_state_is_normalised() {
        let mut rng = StdRng::seed_from_u64(7);
        let psi = random_state_vector(5, &mut rng);
        let norm: f64 = psi.iter().map(|z| z.norm_sqr()).sum();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_state_vector() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(random_state_vector(0, &mut rng).len(), 0);
    }

    #[test]
    fn test_random_density_matrix_is_state() {
        let mut rng = StdRng::seed_from_u64(11);
        let rho = random_density_matrix(4, &mut rng);
        assert!((trace(&rho).re - 1.0).abs() < 1e-12);
        assert!(is_hermitian(&rho, 1e-12));
        assert!(min_eigenvalue(&rho).unwrap() > -1e-12);
    }
}
