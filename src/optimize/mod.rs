// src/optimize/mod.rs
//! Semidefinite modelling for completely bounded norms
//!
//! A program is stated over matrix variables with affine expressions
//! ([`AffineMatrix`]) and handed to an [`SdpSolver`]. The crate ships one
//! backend, [`SeeSawSolver`], specialised to the diamond-norm program.

pub mod affine;
pub mod diamond;
pub mod seesaw;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SolverError;
use crate::linalg::Matrix;

pub use affine::{AffineMatrix, AffineScalar};
pub use diamond::{diamond_norm, diamond_norm_with, diamond_norms, DiamondNormProgram};
pub use seesaw::SeeSawSolver;

/// Structure imposed on a matrix variable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    /// Unconstrained complex entries
    Complex,
    /// Hermitian positive semidefinite
    HermitianPsd,
}

/// A matrix-valued decision variable
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixVariable {
    pub id: usize,
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub kind: VariableKind,
}

impl MatrixVariable {
    pub fn new(id: usize, name: &str, rows: usize, cols: usize, kind: VariableKind) -> Self {
        MatrixVariable {
            id,
            name: name.to_string(),
            rows,
            cols,
            kind,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

/// Solver settings
///
/// `tolerance` bounds the relative duality gap and constraint violation of
/// an `Optimal` solution; `feasibility_tolerance` bounds the constraint
/// violation accepted in any returned point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    pub tolerance: f64,
    pub feasibility_tolerance: f64,
    pub max_iterations: usize,
    /// Log every iteration at `info` level instead of `trace`
    pub verbose: bool,
    /// Wall-clock limit for a single solve
    pub timeout: Option<Duration>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            tolerance: 1e-7,
            feasibility_tolerance: 1e-6,
            max_iterations: 10_000,
            verbose: false,
            timeout: None,
        }
    }
}

impl SolveOptions {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_feasibility_tolerance(mut self, tolerance: f64) -> Self {
        self.feasibility_tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Outcome classification of a successful solve
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Duality gap and constraint violation both within `tolerance`
    Optimal,
    /// Violation within `feasibility_tolerance`, but the gap or the
    /// violation exceeds `tolerance`; `value` is then only a lower bound
    OptimalInaccurate,
}

/// Values of the diamond-norm program's variables
#[derive(Clone, Debug)]
pub struct PrimalPoint {
    pub x: Matrix,
    pub rho0: Matrix,
    pub rho1: Matrix,
}

#[derive(Clone, Debug)]
pub struct SdpSolution {
    pub status: SolveStatus,
    /// Objective value at `point`
    pub value: f64,
    /// Dual objective at a dual-feasible point, if the backend certified one
    pub upper_bound: Option<f64>,
    pub point: PrimalPoint,
    pub iterations: usize,
}

impl SdpSolution {
    /// Distance between the certified upper bound and `value`
    pub fn gap(&self) -> Option<f64> {
        self.upper_bound.map(|bound| (bound - self.value).max(0.0))
    }
}

/// A backend able to solve the diamond-norm program
pub trait SdpSolver {
    fn solve(&self, program: &DiamondNormProgram, options: &SolveOptions) -> Result<SdpSolution, SolverError>;
}
