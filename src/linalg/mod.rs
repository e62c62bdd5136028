// src/linalg/mod.rs
//! Dense complex linear algebra used by every channel representation
//!
//! Matrices are `ndarray` arrays of `Complex64`. Tensor products follow the
//! Kronecker convention (first factor most significant) and subsystem
//! indices are 1-based, matching the way composite systems are described
//! in the rest of the crate.

pub mod basis;
pub mod decomp;

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::{ChannelError, Result};

pub use decomp::{
    hermitian_eigen, inv_sqrtm_psd, inverse, min_eigenvalue, polar_decomposition, positive_part,
    spectral_map, sqrtm_psd, trace_norm, HermitianEigen,
};

/// A dense complex matrix
pub type Matrix = Array2<Complex64>;

/// A dense complex vector
pub type Vector = Array1<Complex64>;

/// Shorthand for building complex numbers
#[inline]
pub fn c64(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Identity matrix of dimension `d`
pub fn identity(d: usize) -> Matrix {
    Array2::from_diag(&Array1::from_elem(d, c64(1.0, 0.0)))
}

/// Computational basis ket `|i⟩` as a `d x 1` column
pub fn ket(d: usize, i: usize) -> Result<Matrix> {
    if i >= d {
        return Err(ChannelError::dimension("ket index", d, i));
    }
    let mut out = Array2::zeros((d, 1));
    out[[i, 0]] = c64(1.0, 0.0);
    Ok(out)
}

/// Conjugate transpose
pub fn dagger(m: &Matrix) -> Matrix {
    m.t().mapv(|z| z.conj())
}

/// Element-wise complex conjugate
pub fn conjugate(m: &Matrix) -> Matrix {
    m.mapv(|z| z.conj())
}

/// Kronecker product A ⊗ B
pub fn kron(a: &Matrix, b: &Matrix) -> Matrix {
    let (ar, ac) = a.dim();
    let (br, bc) = b.dim();
    let mut out = Array2::zeros((ar * br, ac * bc));

    for i in 0..ar {
        for j in 0..ac {
            let aij = a[[i, j]];
            if aij == Complex64::new(0.0, 0.0) {
                continue;
            }
            for k in 0..br {
                for l in 0..bc {
                    out[[i * br + k, j * bc + l]] = aij * b[[k, l]];
                }
            }
        }
    }

    out
}

/// Kronecker product of a sequence, in order; the empty product is `[[1]]`
pub fn kron_all<'a, I>(factors: I) -> Matrix
where
    I: IntoIterator<Item = &'a Matrix>,
{
    factors
        .into_iter()
        .fold(identity(1), |acc, factor| kron(&acc, factor))
}

/// Trace (sum of the main diagonal)
pub fn trace(m: &Matrix) -> Complex64 {
    m.diag().iter().sum()
}

/// Inner product ⟨u|v⟩
pub fn inner(u: &Vector, v: &Vector) -> Complex64 {
    u.iter().zip(v.iter()).map(|(a, b)| a.conj() * b).sum()
}

/// Outer product |u⟩⟨v|
pub fn outer(u: &Vector, v: &Vector) -> Matrix {
    Array2::from_shape_fn((u.len(), v.len()), |(i, j)| u[i] * v[j].conj())
}

/// Turn a vector into a `d x 1` column matrix
pub fn column(v: &Vector) -> Matrix {
    Array2::from_shape_fn((v.len(), 1), |(i, _)| v[i])
}

/// Row-major vectorisation: vec(X) = Σ_j X|j⟩ ⊗ |j⟩
pub fn vectorize(m: &Matrix) -> Vector {
    m.iter().cloned().collect()
}

/// Unnormalised maximally entangled vector Σ_i |i⟩|i⟩ on a `d ⊗ d` space
pub fn max_entangled(d: usize) -> Vector {
    let mut out = Array1::zeros(d * d);
    for i in 0..d {
        out[i * d + i] = c64(1.0, 0.0);
    }
    out
}

/// Projector onto the maximally entangled vector, optionally normalised
pub fn max_entangled_matrix(d: usize, normalized: bool) -> Matrix {
    let gamma = max_entangled(d);
    let projector = outer(&gamma, &gamma);
    if normalized {
        projector.mapv(|z| z / d as f64)
    } else {
        projector
    }
}

/// Frobenius norm
pub fn frobenius_norm(m: &Matrix) -> f64 {
    m.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt()
}

/// Largest entry-wise deviation between two matrices (infinite on shape mismatch)
pub fn max_abs_diff(a: &Matrix, b: &Matrix) -> f64 {
    if a.dim() != b.dim() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
}

/// Check A = A† entry-wise within `tol`
pub fn is_hermitian(m: &Matrix, tol: f64) -> bool {
    m.is_square() && max_abs_diff(m, &dagger(m)) <= tol
}

/// Check UU† = U†U = I entry-wise within `tol`
pub fn is_unitary(u: &Matrix, tol: f64) -> bool {
    if !u.is_square() {
        return false;
    }
    let id = identity(u.nrows());
    let ud = dagger(u);
    max_abs_diff(&u.dot(&ud), &id) <= tol && max_abs_diff(&ud.dot(u), &id) <= tol
}

/// (A + A†) / 2
pub fn hermitian_part(m: &Matrix) -> Matrix {
    (m + &dagger(m)).mapv(|z| z * 0.5)
}

/// Integer power of a square matrix
pub fn matrix_power(m: &Matrix, k: usize) -> Result<Matrix> {
    let d = square_dim(m, "matrix_power")?;
    Ok((0..k).fold(identity(d), |acc, _| acc.dot(m)))
}

/// Modified Gram-Schmidt; vectors whose residual norm is below `tol` are dropped
pub fn gram_schmidt(vectors: &[Vector], tol: f64) -> Vec<Vector> {
    let mut basis: Vec<Vector> = Vec::with_capacity(vectors.len());

    for v in vectors {
        let mut w = v.clone();
        for b in &basis {
            let proj = inner(b, &w);
            w.scaled_add(-proj, b);
        }

        let norm = w.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt();
        if norm > tol {
            basis.push(w.mapv(|z| z / norm));
        }
    }

    basis
}

/// Partial trace over the 1-based subsystems in `sys`
pub fn partial_trace(m: &Matrix, sys: &[usize], dims: &[usize]) -> Result<Matrix> {
    let traced = subsystem_mask(sys, dims.len(), true)?;
    let total: usize = dims.iter().product();
    if m.dim() != (total, total) {
        return Err(ChannelError::shape("partial_trace", (total, total), m.dim()));
    }

    let strides = strides(dims);
    let kept_positions: Vec<usize> = (0..dims.len()).filter(|&p| !traced[p]).collect();
    let traced_positions: Vec<usize> = (0..dims.len()).filter(|&p| traced[p]).collect();

    let kept = offsets(&kept_positions, dims, &strides);
    let inner_offsets = offsets(&traced_positions, dims, &strides);

    let dk = kept.len();
    let mut out = Array2::zeros((dk, dk));

    for i in 0..dk {
        for j in 0..dk {
            let mut sum = Complex64::new(0.0, 0.0);
            for &t in &inner_offsets {
                sum += m[[kept[i] + t, kept[j] + t]];
            }
            out[[i, j]] = sum;
        }
    }

    Ok(out)
}

/// Reorder tensor factors: output subsystem `k` is input subsystem `perm[k]` (1-based)
pub fn permute_subsystems(m: &Matrix, perm: &[usize], dims: &[usize]) -> Result<Matrix> {
    if perm.len() != dims.len() {
        return Err(ChannelError::dimension(
            "permute_subsystems permutation length",
            dims.len(),
            perm.len(),
        ));
    }
    let mask = subsystem_mask(perm, dims.len(), false)?;
    if mask.iter().any(|&hit| !hit) {
        return Err(ChannelError::InvalidSubsystems(format!(
            "{:?} is not a permutation of 1..={}",
            perm,
            dims.len()
        )));
    }

    let total: usize = dims.iter().product();
    if m.dim() != (total, total) {
        return Err(ChannelError::shape("permute_subsystems", (total, total), m.dim()));
    }

    let order: Vec<usize> = perm.iter().map(|p| p - 1).collect();
    let map = offsets(&order, dims, &strides(dims));

    Ok(Array2::from_shape_fn((total, total), |(i, j)| m[[map[i], map[j]]]))
}

/// Validate 1-based subsystem indices and return a membership mask
///
/// `allow_empty` permits an empty selection (a partial trace over nothing).
pub(crate) fn subsystem_mask(sys: &[usize], count: usize, allow_empty: bool) -> Result<Vec<bool>> {
    if sys.is_empty() && !allow_empty {
        return Err(ChannelError::InvalidSubsystems("no subsystems selected".to_string()));
    }

    let mut mask = vec![false; count];
    for &s in sys {
        if s == 0 || s > count {
            return Err(ChannelError::InvalidSubsystems(format!(
                "index {} out of range 1..={}",
                s, count
            )));
        }
        if mask[s - 1] {
            return Err(ChannelError::InvalidSubsystems(format!("index {} repeated", s)));
        }
        mask[s - 1] = true;
    }

    Ok(mask)
}

/// Side length of a square matrix
pub(crate) fn square_dim(m: &Matrix, context: &'static str) -> Result<usize> {
    let (rows, cols) = m.dim();
    if rows != cols {
        return Err(ChannelError::shape(context, (rows, rows), (rows, cols)));
    }
    Ok(rows)
}

// Row-major strides of a composite index
fn strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for p in (0..dims.len().saturating_sub(1)).rev() {
        strides[p] = strides[p + 1] * dims[p + 1];
    }
    strides
}

// Flat offsets of every digit assignment over `positions`, first position most significant
fn offsets(positions: &[usize], dims: &[usize], strides: &[usize]) -> Vec<usize> {
    positions.iter().fold(vec![0], |acc, &p| {
        acc.iter()
            .flat_map(|&base| (0..dims[p]).map(move |digit| base + digit * strides[p]))
            .collect()
    })
}
