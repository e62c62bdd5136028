//! Applying a CP map, given by Kraus operators, to an operator
//!
//! The operand is abstracted by [`ChannelOperand`] so the same routine
//! serves numeric matrices and the affine expressions used to state
//! semidefinite programs.

use std::borrow::Cow;

use itertools::Itertools;
use ndarray::Array2;

use super::kraus_dims;
use crate::error::{ChannelError, Result};
use crate::linalg::{dagger, identity, kron, subsystem_mask, Matrix};

/// Something a Kraus map can act on
pub trait ChannelOperand: Sized {
    /// (rows, cols) of the operand
    fn operand_dim(&self) -> (usize, usize);

    /// Σ_X X · self · X† over the given operators (never empty)
    fn conjugate_sum<I>(&self, operators: I) -> Self
    where
        I: IntoIterator<Item = Matrix>;
}

impl ChannelOperand for Matrix {
    fn operand_dim(&self) -> (usize, usize) {
        self.dim()
    }

    fn conjugate_sum<I>(&self, operators: I) -> Self
    where
        I: IntoIterator<Item = Matrix>,
    {
        operators
            .into_iter()
            .map(|x| x.dot(self).dot(&dagger(&x)))
            .reduce(|acc, term| acc + term)
            .unwrap_or_else(|| Array2::zeros(self.dim()))
    }
}

/// The subsystems a map acts on, within a composite system
#[derive(Clone, Copy, Debug)]
pub struct Subsystems<'a> {
    /// 1-based positions the map acts on
    pub indices: &'a [usize],
    /// Dimension of every subsystem, in order
    pub dims: &'a [usize],
}

impl<'a> Subsystems<'a> {
    pub fn new(indices: &'a [usize], dims: &'a [usize]) -> Self {
        Subsystems { indices, dims }
    }
}

/// Apply the map with Kraus operators `kraus` to `rho`
///
/// With `subsystems` unset the map acts on the whole operator:
/// `Σ_i K_i ρ K_i†`. Otherwise it acts on each listed subsystem
/// independently and as the identity elsewhere. The extension is built
/// directly as a Kraus sum: every tuple of Kraus indices (one per target,
/// consumed in subsystem order) yields the operator
/// `F_1 ⊗ ... ⊗ F_n`, with `F_p` the next chosen Kraus operator on a
/// target position and the identity elsewhere. There are `|K|^k` such
/// operators for `k` targets.
///
/// With `adjoint` set the map `ρ ↦ Σ_i K_i† ρ K_i` is applied instead.
pub fn apply_channel<T: ChannelOperand>(
    kraus: &[Matrix],
    rho: &T,
    subsystems: Option<Subsystems<'_>>,
    adjoint: bool,
) -> Result<T> {
    let (rows, cols) = kraus_dims(kraus)?;

    let ops: Cow<'_, [Matrix]> = if adjoint {
        Cow::Owned(kraus.iter().map(dagger).collect())
    } else {
        Cow::Borrowed(kraus)
    };
    let input_dim = if adjoint { rows } else { cols };

    let target = match subsystems {
        None => {
            if rho.operand_dim() != (input_dim, input_dim) {
                return Err(ChannelError::shape(
                    "apply_channel operand",
                    (input_dim, input_dim),
                    rho.operand_dim(),
                ));
            }
            return Ok(rho.conjugate_sum(ops.iter().cloned()));
        }
        Some(target) => target,
    };

    let mask = subsystem_mask(target.indices, target.dims.len(), false)?;
    let total: usize = target.dims.iter().product();
    if rho.operand_dim() != (total, total) {
        return Err(ChannelError::shape(
            "apply_channel operand",
            (total, total),
            rho.operand_dim(),
        ));
    }
    for (pos, &d) in target.dims.iter().enumerate() {
        if mask[pos] && d != input_dim {
            return Err(ChannelError::dimension(
                "apply_channel target subsystem",
                input_dim,
                d,
            ));
        }
    }

    let ops: &[Matrix] = &ops;
    let composites = (0..target.indices.len())
        .map(|_| 0..ops.len())
        .multi_cartesian_product()
        .map(|choice| extended_operator(ops, &choice, &mask, target.dims));

    Ok(rho.conjugate_sum(composites))
}

// F_1 ⊗ ... ⊗ F_n for one choice of Kraus indices
fn extended_operator(ops: &[Matrix], choice: &[usize], mask: &[bool], dims: &[usize]) -> Matrix {
    let mut next = 0;
    let mut acc = identity(1);
    for (pos, &d) in dims.iter().enumerate() {
        acc = if mask[pos] {
            let op = &ops[choice[next]];
            next += 1;
            kron(&acc, op)
        } else {
            kron(&acc, &identity(d))
        };
    }
    acc
}
