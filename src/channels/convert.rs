//! Conversions between Kraus, Choi, natural, Stinespring and transfer-matrix forms
//!
//! The Choi matrix of a map N from A to B is taken with the map acting on
//! the second half of the unnormalised maximally entangled vector,
//! `C = (id_A ⊗ N)(|Γ⟩⟨Γ|)` with `|Γ⟩ = Σ_i |i⟩|i⟩`, so its rows and
//! columns are indexed by `(a, b)` with `a` most significant.

use std::collections::BTreeMap;

use itertools::Itertools;
use ndarray::{Array, Array2};
use num_complex::Complex64;
use rand::Rng;
use tracing::{debug, warn};

use super::apply::{apply_channel, Subsystems};
use super::{kraus_dims, ChannelIsometry, TransferLayout, TransferMatrix};
use crate::error::{ChannelError, Result};
use crate::linalg::basis::{generate_operator_basis, OperatorBasis};
use crate::linalg::{
    conjugate, dagger, gram_schmidt, hermitian_eigen, identity, is_unitary, ket, kron,
    max_abs_diff, max_entangled_matrix, spectral_map, HermitianEigen, Matrix, Vector,
};
use crate::states::random_state_vector;

/// Entry-wise tolerance for the unitarity check on eigenvectors
const UNITARITY_TOL: f64 = 1e-8;
/// Relative tolerance for Hermiticity and negative eigenvalues of a Choi matrix
const CHOI_TOL: f64 = 1e-8;
/// Residual norm below which Gram-Schmidt treats a vector as dependent
const GRAM_SCHMIDT_TOL: f64 = 1e-10;

/// Choi matrix of the map with Kraus operators `kraus` and input dimension `da`
pub fn choi_representation(kraus: &[Matrix], da: usize) -> Result<Matrix> {
    let (_, cols) = kraus_dims(kraus)?;
    if cols != da {
        return Err(ChannelError::dimension("choi_representation input dimension", da, cols));
    }

    let gamma = max_entangled_matrix(da, false);
    apply_channel(kraus, &gamma, Some(Subsystems::new(&[2], &[da, da])), false)
}

/// Natural representation Σ_i K_i ⊗ conj(K_i)
///
/// Satisfies vec(N(ρ)) = M vec(ρ) for row-major vectorisation.
pub fn natural_representation(kraus: &[Matrix]) -> Result<Matrix> {
    let (rows, cols) = kraus_dims(kraus)?;
    Ok(kraus.iter().fold(Array2::zeros((rows * rows, cols * cols)), |acc: Matrix, k| {
        acc + kron(k, &conjugate(k))
    }))
}

/// Check shape and Hermiticity, then diagonalise a Choi matrix
///
/// Negative eigenvalues beyond tolerance mean the map is not completely
/// positive and are reported rather than clipped.
fn choi_spectrum(choi: &Matrix, da: usize, db: usize, context: &'static str) -> Result<HermitianEigen> {
    let n = da * db;
    if choi.dim() != (n, n) {
        return Err(ChannelError::shape(context, (n, n), choi.dim()));
    }

    let scale = choi.iter().fold(1.0_f64, |acc, z| acc.max(z.norm()));
    if max_abs_diff(choi, &dagger(choi)) > CHOI_TOL * scale {
        return Err(ChannelError::InvalidMap(format!("{}: Choi matrix is not Hermitian", context)));
    }

    let eig = hermitian_eigen(choi)?;
    let spectral_scale = eig.eigenvalues.iter().fold(1.0_f64, |acc, l| acc.max(l.abs()));
    if let Some(&lowest) = eig.eigenvalues.last() {
        if lowest < -CHOI_TOL * spectral_scale {
            return Err(ChannelError::NotCompletelyPositive { eigenvalue: lowest });
        }
    }

    Ok(eig)
}

// Return `u` if unitary, otherwise rebuild it from Gram-Schmidt-orthonormalised columns
fn orthonormal_columns(u: &Matrix) -> Result<Matrix> {
    if is_unitary(u, UNITARITY_TOL) {
        return Ok(u.clone());
    }

    let n = u.ncols();
    let deviation = max_abs_diff(&dagger(u).dot(u), &identity(n));
    warn!(deviation, "eigenvector matrix is not unitary, orthonormalising with Gram-Schmidt");

    let columns: Vec<Vector> = u.columns().into_iter().map(|c| c.to_owned()).collect();
    let basis = gram_schmidt(&columns, GRAM_SCHMIDT_TOL);
    if basis.len() != n {
        return Err(ChannelError::NumericalInstability {
            context: "Choi eigenvectors",
            deviation,
        });
    }

    let rebuilt = Array2::from_shape_fn((u.nrows(), n), |(i, j)| basis[j][i]);
    if !is_unitary(&rebuilt, UNITARITY_TOL) {
        return Err(ChannelError::NumericalInstability {
            context: "Choi eigenvectors after Gram-Schmidt",
            deviation: max_abs_diff(&dagger(&rebuilt).dot(&rebuilt), &identity(n)),
        });
    }

    Ok(rebuilt)
}

/// Kraus operators of the CP map with Choi matrix `choi`
///
/// For each eigenpair (λ, u) the operator is `sqrt(λ) · reshape(u, [dA, dB])ᵀ`,
/// i.e. `K[b, a] = sqrt(λ) u[a·dB + b]`. One operator is returned per
/// eigenvalue, so zero eigenvalues produce zero operators.
pub fn choi_to_kraus(choi: &Matrix, da: usize, db: usize) -> Result<Vec<Matrix>> {
    let eig = choi_spectrum(choi, da, db, "choi_to_kraus")?;
    kraus_from_spectrum(&eig, da, db)
}

fn kraus_from_spectrum(eig: &HermitianEigen, da: usize, db: usize) -> Result<Vec<Matrix>> {
    let u = orthonormal_columns(&eig.eigenvectors)?;

    Ok(eig
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, &lambda)| {
            let weight = lambda.max(0.0).sqrt();
            Array2::from_shape_fn((db, da), |(b, a)| u[[a * db + b, i]] * weight)
        })
        .collect())
}

/// Natural representation from a Choi matrix by index reshuffling
///
/// Reads the Choi matrix as a tensor with axes (a, b, a', b'), reorders
/// them to (a, a', b, b'), flattens to dA² x dB² and transposes.
pub fn choi_to_natural(choi: &Matrix, da: usize, db: usize) -> Result<Matrix> {
    let n = da * db;
    if choi.dim() != (n, n) {
        return Err(ChannelError::shape("choi_to_natural", (n, n), choi.dim()));
    }

    let tensor = Array::from_shape_vec((da, db, da, db), choi.iter().cloned().collect())
        .map_err(|_| ChannelError::shape("choi_to_natural", (n, n), choi.dim()))?;
    let reordered = tensor.permuted_axes([0, 2, 1, 3]);
    let flat = Array2::from_shape_vec((da * da, db * db), reordered.iter().cloned().collect())
        .map_err(|_| ChannelError::shape("choi_to_natural", (n, n), choi.dim()))?;

    Ok(flat.t().to_owned())
}

/// Stinespring isometry of the CP map with Choi matrix `choi`
///
/// Purifies the Choi matrix as vec(√C) and contracts the input with the
/// maximally entangled vector: V = (⟨Γ|_{AA'} ⊗ I)(I_A ⊗ vec(√C)). The
/// environment is E = A ⊗ B, so V has shape (dB·dA·dB) x dA with
/// `V[(b, e), a] = √C[(a, b), e]`.
pub fn choi_to_stinespring(choi: &Matrix, da: usize, db: usize) -> Result<Matrix> {
    let eig = choi_spectrum(choi, da, db, "choi_to_stinespring")?;
    let root = spectral_map(&eig, |l| l.max(0.0).sqrt());
    let env = da * db;

    Ok(Array2::from_shape_fn((db * env, da), |(row, a)| {
        let (b, e) = (row / env, row % env);
        root[[a * db + b, e]]
    }))
}

/// Isometric extension V = Σ_i K_i ⊗ |i⟩_E and, for dA = dB, a unitary extension
///
/// The unitary acts on A ⊗ E, sends |a⟩|0⟩ to V|a⟩ and fills the remaining
/// columns with a Gram-Schmidt completion of random vectors. It is only
/// produced when V is an isometry (the map is trace preserving).
pub fn generate_channel_isometry<R: Rng + ?Sized>(
    kraus: &[Matrix],
    da: usize,
    db: usize,
    rng: &mut R,
) -> Result<ChannelIsometry> {
    let (rows, cols) = kraus_dims(kraus)?;
    if (rows, cols) != (db, da) {
        return Err(ChannelError::shape("generate_channel_isometry", (db, da), (rows, cols)));
    }

    let dim_e = kraus.len();
    let isometry = kraus
        .iter()
        .enumerate()
        .try_fold(Array2::zeros((db * dim_e, da)), |acc: Matrix, (i, k)| -> Result<Matrix> {
            Ok(acc + kron(k, &ket(dim_e, i)?))
        })?;

    if da != db {
        return Ok(ChannelIsometry {
            isometry,
            unitary: None,
        });
    }

    let deviation = max_abs_diff(&dagger(&isometry).dot(&isometry), &identity(da));
    if deviation > UNITARITY_TOL {
        debug!(deviation, "Kraus operators are not trace preserving, skipping unitary extension");
        return Ok(ChannelIsometry {
            isometry,
            unitary: None,
        });
    }

    let d = da * dim_e;
    let mut states: Vec<Vector> = isometry.columns().into_iter().map(|c| c.to_owned()).collect();
    states.extend((0..d - da).map(|_| random_state_vector(d, rng)));

    let completed = gram_schmidt(&states, GRAM_SCHMIDT_TOL);
    if completed.len() != d {
        return Err(ChannelError::NumericalInstability {
            context: "unitary extension",
            deviation: (d - completed.len()) as f64,
        });
    }

    let mut unitary: Matrix = Array2::zeros((d, d));
    let mut fill = completed.iter().skip(da);
    for a in 0..da {
        unitary.column_mut(a * dim_e).assign(&isometry.column(a));
        for j in 1..dim_e {
            if let Some(state) = fill.next() {
                unitary.column_mut(a * dim_e + j).assign(state);
            }
        }
    }

    Ok(ChannelIsometry {
        isometry,
        unitary: Some(unitary),
    })
}

// Tr(A† B) without forming the product
fn hs_inner(a: &Matrix, b: &Matrix) -> Complex64 {
    a.iter().zip(b.iter()).map(|(x, y)| x.conj() * y).sum()
}

/// Coefficients c[i, j] = (1/dB) Tr(B_i† N(B_j)) of the map in an operator basis
///
/// `OperatorBasis::Standard` returns the natural representation instead.
pub fn transfer_matrix(
    kraus: &[Matrix],
    da: usize,
    db: usize,
    basis: OperatorBasis,
    layout: TransferLayout,
) -> Result<TransferMatrix> {
    let (rows, cols) = kraus_dims(kraus)?;
    if (rows, cols) != (db, da) {
        return Err(ChannelError::shape("transfer_matrix", (db, da), (rows, cols)));
    }

    let dense = if basis == OperatorBasis::Standard {
        natural_representation(kraus)?
    } else {
        let inputs = generate_operator_basis(da, basis)?;
        let outputs = generate_operator_basis(db, basis)?;
        let images = inputs
            .iter()
            .map(|b| apply_channel(kraus, b, None, false))
            .collect::<Result<Vec<_>>>()?;

        Array2::from_shape_fn((outputs.len(), images.len()), |(i, j)| {
            hs_inner(&outputs[i], &images[j]) / db as f64
        })
    };

    Ok(match layout {
        TransferLayout::Dense => TransferMatrix::Dense(dense),
        TransferLayout::Map => {
            let (n_out, n_in) = dense.dim();
            let map: BTreeMap<(usize, usize), Complex64> = (0..n_out)
                .cartesian_product(0..n_in)
                .map(|(i, j)| ((i, j), dense[[i, j]]))
                .collect();
            TransferMatrix::Map(map)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::c64;

    #[test]
    fn test_choi_of_identity_is_gamma() {
        let choi = choi_representation(&[identity(3)], 3).unwrap();
        assert!(max_abs_diff(&choi, &max_entangled_matrix(3, false)) < 1e-12);
    }

    #[test]
    fn test_non_hermitian_choi_rejected() {
        let mut choi = identity(4);
        choi[[0, 1]] = c64(1.0, 0.0);
        assert!(matches!(choi_to_kraus(&choi, 2, 2), Err(ChannelError::InvalidMap(_))));
    }

    #[test]
    fn test_negative_choi_rejected() {
        let mut choi = identity(4);
        choi[[3, 3]] = c64(-0.5, 0.0);
        assert!(matches!(
            choi_to_kraus(&choi, 2, 2),
            Err(ChannelError::NotCompletelyPositive { .. })
        ));
    }

    #[test]
    fn test_kraus_from_skewed_degenerate_eigenvectors() {
        // Choi of complete dephasing: eigenvalue 1 on |00⟩, |11⟩ and 0 on |01⟩, |10⟩
        let projectors: Vec<Matrix> = (0..2)
            .map(|k| {
                let v = ket(2, k).unwrap();
                v.dot(&dagger(&v))
            })
            .collect();
        let choi = choi_representation(&projectors, 2).unwrap();

        // a valid but non-orthogonal eigenbasis of the degenerate eigenspace
        let r = c64(0.5f64.sqrt(), 0.0);
        let zero = c64(0.0, 0.0);
        let one = c64(1.0, 0.0);
        let eig = HermitianEigen {
            eigenvalues: vec![1.0, 1.0, 0.0, 0.0],
            eigenvectors: ndarray::array![
                [one, r, zero, zero],
                [zero, zero, one, zero],
                [zero, zero, zero, one],
                [zero, r, zero, zero]
            ],
        };

        let kraus = kraus_from_spectrum(&eig, 2, 2).unwrap();
        assert_eq!(kraus.len(), 4);
        assert!(max_abs_diff(&choi_representation(&kraus, 2).unwrap(), &choi) < 1e-12);
    }

    #[test]
    fn test_orthonormal_columns_repairs_skewed_basis() {
        let mut u = identity(2);
        u[[0, 1]] = c64(0.5, 0.0);
        let fixed = orthonormal_columns(&u).unwrap();
        assert!(is_unitary(&fixed, 1e-10));
    }
}
