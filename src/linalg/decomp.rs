//! Matrix decompositions backed by `nalgebra`
//!
//! Storage stays in `ndarray`; matrices are copied into `nalgebra::DMatrix`
//! only for the eigen- and singular-value solvers.

use nalgebra::DMatrix;
use ndarray::Array2;
use num_complex::Complex64;

use super::{dagger, hermitian_part, square_dim, Matrix};
use crate::error::{ChannelError, Result};

const MAX_SWEEPS: usize = 10_000;

/// Eigendecomposition of a Hermitian matrix, eigenvalues in descending order
#[derive(Clone, Debug)]
pub struct HermitianEigen {
    /// Real eigenvalues, largest first
    pub eigenvalues: Vec<f64>,
    /// Orthonormal eigenvectors as columns, matching `eigenvalues`
    pub eigenvectors: Matrix,
}

fn to_dmatrix(m: &Matrix) -> DMatrix<Complex64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[[i, j]])
}

fn from_dmatrix(m: &DMatrix<Complex64>) -> Matrix {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

fn check_finite(m: &Matrix, context: &'static str) -> Result<()> {
    if m.iter().all(|z| z.re.is_finite() && z.im.is_finite()) {
        Ok(())
    } else {
        Err(ChannelError::NumericalInstability {
            context,
            deviation: f64::NAN,
        })
    }
}

/// Eigendecomposition of the Hermitian part of `m`
pub fn hermitian_eigen(m: &Matrix) -> Result<HermitianEigen> {
    square_dim(m, "hermitian_eigen")?;
    check_finite(m, "hermitian eigendecomposition")?;

    let eig = to_dmatrix(&hermitian_part(m))
        .try_symmetric_eigen(f64::EPSILON, MAX_SWEEPS)
        .ok_or(ChannelError::NumericalInstability {
            context: "hermitian eigendecomposition",
            deviation: f64::NAN,
        })?;

    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let vectors = from_dmatrix(&eig.eigenvectors);
    let n = vectors.nrows();

    Ok(HermitianEigen {
        eigenvalues: order.iter().map(|&k| eig.eigenvalues[k]).collect(),
        eigenvectors: Array2::from_shape_fn((n, order.len()), |(i, j)| vectors[[i, order[j]]]),
    })
}

/// V f(Λ) V† for a Hermitian eigendecomposition
pub fn spectral_map<F>(eig: &HermitianEigen, f: F) -> Matrix
where
    F: Fn(f64) -> f64,
{
    let mut scaled = eig.eigenvectors.clone();
    for (mut col, &lambda) in scaled.columns_mut().into_iter().zip(eig.eigenvalues.iter()) {
        let factor = f(lambda);
        col.mapv_inplace(|z| z * factor);
    }
    scaled.dot(&dagger(&eig.eigenvectors))
}

/// Square root of a positive semidefinite matrix
///
/// Eigenvalues in `[-tol, 0)` are treated as zero; anything more negative
/// means the square root does not exist.
pub fn sqrtm_psd(m: &Matrix, tol: f64) -> Result<Matrix> {
    let eig = hermitian_eigen(m)?;
    let scale = eig.eigenvalues.iter().fold(1.0_f64, |acc, l| acc.max(l.abs()));
    if let Some(&lowest) = eig.eigenvalues.last() {
        if lowest < -tol * scale {
            return Err(ChannelError::NumericalInstability {
                context: "matrix square root",
                deviation: lowest,
            });
        }
    }
    Ok(spectral_map(&eig, |l| l.max(0.0).sqrt()))
}

/// M^{-1/2} for a positive definite matrix
pub fn inv_sqrtm_psd(m: &Matrix, tol: f64) -> Result<Matrix> {
    let eig = hermitian_eigen(m)?;
    if let Some(&lowest) = eig.eigenvalues.last() {
        if lowest <= tol {
            return Err(ChannelError::NumericalInstability {
                context: "inverse square root",
                deviation: lowest,
            });
        }
    }
    Ok(spectral_map(&eig, |l| 1.0 / l.sqrt()))
}

/// Positive part of the Hermitian part of `m`
pub fn positive_part(m: &Matrix) -> Result<Matrix> {
    let eig = hermitian_eigen(m)?;
    Ok(spectral_map(&eig, |l| l.max(0.0)))
}

/// Smallest eigenvalue of the Hermitian part of `m`
pub fn min_eigenvalue(m: &Matrix) -> Result<f64> {
    let eig = hermitian_eigen(m)?;
    Ok(eig.eigenvalues.last().copied().unwrap_or(0.0))
}

/// Unitary polar factor of a square matrix together with its trace norm
///
/// For M = W Σ V† the unitary factor is W V†, which maximises Re Tr(M† U)
/// over contractions U; the maximum is the trace norm Σ σ_i.
pub fn polar_decomposition(m: &Matrix) -> Result<(Matrix, f64)> {
    square_dim(m, "polar_decomposition")?;
    check_finite(m, "polar decomposition")?;

    let svd = to_dmatrix(m)
        .try_svd(true, true, f64::EPSILON, MAX_SWEEPS)
        .ok_or(ChannelError::NumericalInstability {
            context: "singular value decomposition",
            deviation: f64::NAN,
        })?;

    let trace_norm = svd.singular_values.iter().sum::<f64>();
    match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => Ok((from_dmatrix(&(u * v_t)), trace_norm)),
        _ => Err(ChannelError::NumericalInstability {
            context: "singular value decomposition",
            deviation: f64::NAN,
        }),
    }
}

/// Inverse of a square matrix
pub fn inverse(m: &Matrix) -> Result<Matrix> {
    square_dim(m, "inverse")?;
    check_finite(m, "matrix inverse")?;

    to_dmatrix(m)
        .try_inverse()
        .map(|inv| from_dmatrix(&inv))
        .ok_or(ChannelError::NumericalInstability {
            context: "matrix inverse of a singular matrix",
            deviation: 0.0,
        })
}

/// Sum of singular values
pub fn trace_norm(m: &Matrix) -> Result<f64> {
    check_finite(m, "trace norm")?;
    let (rows, cols) = m.dim();
    if rows == 0 || cols == 0 {
        return Ok(0.0);
    }
    let svd = to_dmatrix(m)
        .try_svd(false, false, f64::EPSILON, MAX_SWEEPS)
        .ok_or(ChannelError::NumericalInstability {
            context: "singular value decomposition",
            deviation: f64::NAN,
        })?;
    Ok(svd.singular_values.iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{c64, identity, is_unitary, max_abs_diff};
    use ndarray::array;

    #[test]
    fn test_eigenvalues_sorted_and_reconstruct() {
        let m = array![[c64(2.0, 0.0), c64(0.0, 1.0)], [c64(0.0, -1.0), c64(2.0, 0.0)]];
        let eig = hermitian_eigen(&m).unwrap();
        assert!((eig.eigenvalues[0] - 3.0).abs() < 1e-12);
        assert!((eig.eigenvalues[1] - 1.0).abs() < 1e-12);
        assert!(is_unitary(&eig.eigenvectors, 1e-10));
        assert!(max_abs_diff(&spectral_map(&eig, |l| l), &m) < 1e-12);
    }

    #[test]
    fn test_sqrtm_squares_back() {
        let m = array![[c64(2.0, 0.0), c64(1.0, 1.0)], [c64(1.0, -1.0), c64(3.0, 0.0)]];
        let s = sqrtm_psd(&m, 1e-10).unwrap();
        assert!(max_abs_diff(&s.dot(&s), &m) < 1e-10);

        let inv = inv_sqrtm_psd(&m, 1e-12).unwrap();
        assert!(max_abs_diff(&inv.dot(&m).dot(&inv), &identity(2)) < 1e-10);
    }

    #[test]
    fn test_sqrtm_rejects_negative() {
        let m = array![[c64(1.0, 0.0), c64(0.0, 0.0)], [c64(0.0, 0.0), c64(-1.0, 0.0)]];
        assert!(sqrtm_psd(&m, 1e-10).is_err());
        assert!(inv_sqrtm_psd(&m, 1e-10).is_err());
    }

    #[test]
    fn test_inverse() {
        let m = array![[c64(2.0, 0.0), c64(0.0, 1.0)], [c64(1.0, 0.0), c64(1.0, 0.0)]];
        let inv = inverse(&m).unwrap();
        assert!(max_abs_diff(&m.dot(&inv), &identity(2)) < 1e-12);

        let singular = array![[c64(1.0, 0.0), c64(2.0, 0.0)], [c64(2.0, 0.0), c64(4.0, 0.0)]];
        assert!(inverse(&singular).is_err());
    }

    #[test]
    fn test_polar_of_hermitian_gives_sign() {
        let m = array![[c64(1.0, 0.0), c64(0.0, 0.0)], [c64(0.0, 0.0), c64(-2.0, 0.0)]];
        let (u, norm) = polar_decomposition(&m).unwrap();
        assert!((norm - 3.0).abs() < 1e-12);
        let sign = array![[c64(1.0, 0.0), c64(0.0, 0.0)], [c64(0.0, 0.0), c64(-1.0, 0.0)]];
        assert!(max_abs_diff(&u, &sign) < 1e-10);
        assert!((trace_norm(&m).unwrap() - 3.0).abs() < 1e-12);
    }
}
