//! Operator bases: Pauli strings, discrete Weyl operators, SU(d)
//!
//! Every basis other than [`OperatorBasis::Standard`] is normalised so that
//! `Tr(B_i† B_j) = d δ_ij` on a `d`-dimensional space.

use std::f64::consts::PI;

use itertools::Itertools;
use ndarray::{array, Array2};
use serde::{Deserialize, Serialize};

use super::{c64, identity, kron_all, matrix_power, Matrix};
use crate::error::{ChannelError, Result};

/// Choice of operator basis for transfer matrices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorBasis {
    /// Matrix units |i⟩⟨j|
    Standard,
    /// Discrete Weyl operators W(z, x) on the full space
    Weyl,
    /// Tensor products of single-qudit Weyl operators
    WeylTensor { local_dim: usize },
    /// Identity plus generalised Gell-Mann matrices
    SpecialUnitary,
    /// Tensor products of single-qudit SU(d) bases
    SpecialUnitaryTensor { local_dim: usize },
    /// Tensor products of single-qubit Paulis
    Pauli,
}

/// Single-qubit Pauli operator: 0 = I, 1 = X, 2 = Y, 3 = Z
pub fn pauli(k: usize) -> Result<Matrix> {
    let zero = c64(0.0, 0.0);
    let one = c64(1.0, 0.0);
    let i = c64(0.0, 1.0);

    match k {
        0 => Ok(identity(2)),
        1 => Ok(array![[zero, one], [one, zero]]),
        2 => Ok(array![[zero, -i], [i, zero]]),
        3 => Ok(array![[one, zero], [zero, -one]]),
        _ => Err(ChannelError::dimension("pauli index", 3, k)),
    }
}

/// Tensor product of single-qubit Paulis, one index per qubit
pub fn n_qubit_pauli(indices: &[usize]) -> Result<Matrix> {
    let factors = indices.iter().map(|&k| pauli(k)).collect::<Result<Vec<_>>>()?;
    Ok(kron_all(&factors))
}

/// X^{a_1} ⊗ ... ⊗ X^{a_n} for a bit string `a`
pub fn n_qubit_pauli_x(bits: &[usize]) -> Result<Matrix> {
    n_qubit_pauli(&bits.iter().map(|&b| if b % 2 == 1 { 1 } else { 0 }).collect::<Vec<_>>())
}

/// Z^{b_1} ⊗ ... ⊗ Z^{b_n} for a bit string `b`
pub fn n_qubit_pauli_z(bits: &[usize]) -> Result<Matrix> {
    n_qubit_pauli(&bits.iter().map(|&b| if b % 2 == 1 { 3 } else { 0 }).collect::<Vec<_>>())
}

/// Shift operator X|k⟩ = |k+1 mod d⟩
pub fn discrete_weyl_x(d: usize) -> Matrix {
    let mut out = Array2::zeros((d, d));
    for k in 0..d {
        out[[(k + 1) % d, k]] = c64(1.0, 0.0);
    }
    out
}

/// Clock operator Z|k⟩ = ω^k |k⟩ with ω = e^{2πi/d}
pub fn discrete_weyl_z(d: usize) -> Matrix {
    let mut out = Array2::zeros((d, d));
    for k in 0..d {
        let phase = 2.0 * PI * k as f64 / d as f64;
        out[[k, k]] = c64(phase.cos(), phase.sin());
    }
    out
}

/// Discrete Weyl operator W(z, x) = Z^z X^x
pub fn discrete_weyl(d: usize, z: usize, x: usize) -> Result<Matrix> {
    Ok(matrix_power(&discrete_weyl_z(d), z)?.dot(&matrix_power(&discrete_weyl_x(d), x)?))
}

fn weyl_basis(d: usize) -> Result<Vec<Matrix>> {
    (0..d)
        .cartesian_product(0..d)
        .map(|(z, x)| discrete_weyl(d, z, x))
        .collect()
}

fn special_unitary_basis(d: usize) -> Vec<Matrix> {
    let scale = (d as f64 / 2.0).sqrt();
    let mut basis = vec![identity(d)];

    for j in 0..d {
        for k in (j + 1)..d {
            let mut sym = Array2::zeros((d, d));
            sym[[j, k]] = c64(scale, 0.0);
            sym[[k, j]] = c64(scale, 0.0);
            basis.push(sym);
        }
    }

    for j in 0..d {
        for k in (j + 1)..d {
            let mut anti = Array2::zeros((d, d));
            anti[[j, k]] = c64(0.0, -scale);
            anti[[k, j]] = c64(0.0, scale);
            basis.push(anti);
        }
    }

    for l in 1..d {
        let norm = (2.0 / (l * (l + 1)) as f64).sqrt() * scale;
        let mut diag = Array2::zeros((d, d));
        for j in 0..l {
            diag[[j, j]] = c64(norm, 0.0);
        }
        diag[[l, l]] = c64(-(l as f64) * norm, 0.0);
        basis.push(diag);
    }

    basis
}

fn standard_basis(d: usize) -> Vec<Matrix> {
    (0..d)
        .cartesian_product(0..d)
        .map(|(i, j)| {
            let mut unit = Array2::zeros((d, d));
            unit[[i, j]] = c64(1.0, 0.0);
            unit
        })
        .collect()
}

// Number of factors n with local^n == dim
fn tensor_power_count(dim: usize, local_dim: usize) -> Result<usize> {
    if local_dim < 2 {
        return Err(ChannelError::UnsupportedConfiguration(format!(
            "local dimension {} is too small for a tensor basis",
            local_dim
        )));
    }
    let mut n = 0;
    let mut acc = 1;
    while acc < dim {
        acc *= local_dim;
        n += 1;
    }
    if acc != dim || n == 0 {
        return Err(ChannelError::UnsupportedConfiguration(format!(
            "dimension {} is not a power of {}",
            dim, local_dim
        )));
    }
    Ok(n)
}

fn tensor_basis(local: &[Matrix], n: usize) -> Vec<Matrix> {
    (0..n)
        .map(|_| 0..local.len())
        .multi_cartesian_product()
        .map(|choice| kron_all(choice.iter().map(|&k| &local[k])))
        .collect()
}

/// Generate the `dim^2` operators of the requested basis
pub fn generate_operator_basis(dim: usize, basis: OperatorBasis) -> Result<Vec<Matrix>> {
    if dim == 0 {
        return Err(ChannelError::UnsupportedConfiguration(
            "operator basis on a zero-dimensional space".to_string(),
        ));
    }

    match basis {
        OperatorBasis::Standard => Ok(standard_basis(dim)),
        OperatorBasis::Weyl => weyl_basis(dim),
        OperatorBasis::SpecialUnitary => Ok(special_unitary_basis(dim)),
        OperatorBasis::WeylTensor { local_dim } => {
            let n = tensor_power_count(dim, local_dim)?;
            Ok(tensor_basis(&weyl_basis(local_dim)?, n))
        }
        OperatorBasis::SpecialUnitaryTensor { local_dim } => {
            let n = tensor_power_count(dim, local_dim)?;
            Ok(tensor_basis(&special_unitary_basis(local_dim), n))
        }
        OperatorBasis::Pauli => {
            let n = tensor_power_count(dim, 2)?;
            let local = (0..4).map(pauli).collect::<Result<Vec<_>>>()?;
            Ok(tensor_basis(&local, n))
        }
    }
}
