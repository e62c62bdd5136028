//! Affine expressions over a single matrix variable
//!
//! An [`AffineMatrix`] stores `vec(E(V)) = L vec(V) + vec(C)` with
//! row-major vectorisation, so that Kraus conjugation `X E X†` acts on the
//! linear part as `X ⊗ conj(X)`.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::MatrixVariable;
use crate::channels::ChannelOperand;
use crate::error::{ChannelError, Result};
use crate::linalg::{conjugate, dagger, identity, kron, vectorize, Matrix, Vector};

/// Matrix-valued affine function of one [`MatrixVariable`]
#[derive(Clone, Debug)]
pub struct AffineMatrix {
    variable: MatrixVariable,
    shape: (usize, usize),
    linear: Matrix,
    offset: Matrix,
}

/// Scalar affine function `l · vec(V) + c`
#[derive(Clone, Debug)]
pub struct AffineScalar {
    variable: MatrixVariable,
    linear: Vector,
    offset: Complex64,
}

fn check_value(variable: &MatrixVariable, value: &Matrix) -> Result<()> {
    if value.dim() != variable.shape() {
        return Err(ChannelError::shape("affine expression variable", variable.shape(), value.dim()));
    }
    Ok(())
}

impl AffineMatrix {
    /// The identity expression E(V) = V
    pub fn from_variable(variable: &MatrixVariable) -> Self {
        let (rows, cols) = variable.shape();
        AffineMatrix {
            variable: variable.clone(),
            shape: (rows, cols),
            linear: identity(rows * cols),
            offset: Array2::zeros((rows, cols)),
        }
    }

    pub fn variable(&self) -> &MatrixVariable {
        &self.variable
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Value of the expression at V = `value`
    pub fn evaluate(&self, value: &Matrix) -> Result<Matrix> {
        check_value(&self.variable, value)?;
        let flat = self.linear.dot(&vectorize(value)) + vectorize(&self.offset);
        Array2::from_shape_vec(self.shape, flat.to_vec())
            .map_err(|_| ChannelError::shape("affine expression value", self.shape, value.dim()))
    }

    /// Trace of a square expression
    pub fn trace(&self) -> Result<AffineScalar> {
        let (rows, cols) = self.shape;
        if rows != cols {
            return Err(ChannelError::shape("affine trace", (rows, rows), self.shape));
        }

        let width = self.linear.ncols();
        let linear: Vector = Array1::from_shape_fn(width, |k| {
            (0..rows).map(|i| self.linear[[i * cols + i, k]]).sum::<Complex64>()
        });
        let offset: Complex64 = (0..rows).map(|i| self.offset[[i, i]]).sum();

        Ok(AffineScalar {
            variable: self.variable.clone(),
            linear,
            offset,
        })
    }
}

impl AffineScalar {
    pub fn variable(&self) -> &MatrixVariable {
        &self.variable
    }

    pub fn evaluate(&self, value: &Matrix) -> Result<Complex64> {
        check_value(&self.variable, value)?;
        let dot: Complex64 = self
            .linear
            .iter()
            .zip(value.iter())
            .map(|(l, v)| l * v)
            .sum();
        Ok(dot + self.offset)
    }
}

impl ChannelOperand for AffineMatrix {
    fn operand_dim(&self) -> (usize, usize) {
        self.shape
    }

    fn conjugate_sum<I>(&self, operators: I) -> Self
    where
        I: IntoIterator<Item = Matrix>,
    {
        let terms = operators
            .into_iter()
            .map(|x| {
                let linear = kron(&x, &conjugate(&x)).dot(&self.linear);
                let offset = x.dot(&self.offset).dot(&dagger(&x));
                (linear, offset)
            })
            .reduce(|(l1, o1), (l2, o2)| (l1 + l2, o1 + o2));

        match terms {
            Some((linear, offset)) => AffineMatrix {
                variable: self.variable.clone(),
                shape: offset.dim(),
                linear,
                offset,
            },
            None => AffineMatrix {
                variable: self.variable.clone(),
                shape: self.shape,
                linear: Array2::zeros(self.linear.dim()),
                offset: Array2::zeros(self.shape),
            },
        }
    }
}
