//! The diamond norm as a semidefinite program
//!
//! Primal form (Watrous, "Simpler semidefinite programs for completely
//! bounded norms", Thm 3.1): maximise ½ Re Tr(J†X) + ½ Re Tr(J X†) over
//! X, ρ0, ρ1 subject to
//!
//! ```text
//! [ I_B ⊗ ρ0    X      ]
//! [ X†       I_B ⊗ ρ1  ] ⪰ 0,   Tr ρ0 = Tr ρ1 = 1,   ρ0, ρ1 ⪰ 0
//! ```
//!
//! where J is the Choi matrix with the map acting on the first factor.
//! Choi matrices elsewhere in the crate have the map on the second factor,
//! so the program swaps the two subsystems on construction.

use ndarray::{s, Array2};
use rayon::prelude::*;
use tracing::{debug, warn};

use super::affine::{AffineMatrix, AffineScalar};
use super::seesaw::SeeSawSolver;
use super::{MatrixVariable, PrimalPoint, SdpSolver, SolveOptions, SolveStatus, VariableKind};
use crate::channels::apply_channel;
use crate::error::{ChannelError, Result};
use crate::linalg::{
    dagger, hermitian_eigen, identity, ket, kron, max_abs_diff, min_eigenvalue, partial_trace,
    permute_subsystems, Matrix,
};

/// The diamond-norm program for one Choi matrix
#[derive(Clone, Debug)]
pub struct DiamondNormProgram {
    choi: Matrix,
    input_dim: usize,
    output_dim: usize,
    x: MatrixVariable,
    rho0: MatrixVariable,
    rho1: MatrixVariable,
    rho0_block: AffineMatrix,
    rho1_block: AffineMatrix,
    rho0_trace: AffineScalar,
    rho1_trace: AffineScalar,
}

impl DiamondNormProgram {
    /// State the program for a map from dimension `da` to `db` with Choi matrix `choi`
    pub fn new(choi: &Matrix, da: usize, db: usize) -> Result<Self> {
        let n = da * db;
        if choi.dim() != (n, n) {
            return Err(ChannelError::shape("diamond norm Choi matrix", (n, n), choi.dim()));
        }

        let swapped = permute_subsystems(choi, &[2, 1], &[da, db])?;

        let x = MatrixVariable::new(0, "X", n, n, VariableKind::Complex);
        let rho0 = MatrixVariable::new(1, "rho0", da, da, VariableKind::HermitianPsd);
        let rho1 = MatrixVariable::new(2, "rho1", da, da, VariableKind::HermitianPsd);

        // {|b⟩ ⊗ I_A} sends ρ to I_B ⊗ ρ
        let embedding = (0..db)
            .map(|b| Ok(kron(&ket(db, b)?, &identity(da))))
            .collect::<Result<Vec<_>>>()?;

        let rho0_block = apply_channel(&embedding, &AffineMatrix::from_variable(&rho0), None, false)?;
        let rho1_block = apply_channel(&embedding, &AffineMatrix::from_variable(&rho1), None, false)?;
        let rho0_trace = AffineMatrix::from_variable(&rho0).trace()?;
        let rho1_trace = AffineMatrix::from_variable(&rho1).trace()?;

        Ok(DiamondNormProgram {
            choi: swapped,
            input_dim: da,
            output_dim: db,
            x,
            rho0,
            rho1,
            rho0_block,
            rho1_block,
            rho0_trace,
            rho1_trace,
        })
    }

    /// Choi matrix with the map on the first factor (B ⊗ A ordering)
    pub fn choi(&self) -> &Matrix {
        &self.choi
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn variables(&self) -> [&MatrixVariable; 3] {
        [&self.x, &self.rho0, &self.rho1]
    }

    fn check_point(&self, point: &PrimalPoint) -> Result<()> {
        for (var, value) in [(&self.x, &point.x), (&self.rho0, &point.rho0), (&self.rho1, &point.rho1)] {
            if value.dim() != var.shape() {
                return Err(ChannelError::shape("diamond norm primal point", var.shape(), value.dim()));
            }
        }
        Ok(())
    }

    /// ½ Re Tr(J†X) + ½ Re Tr(J X†)
    pub fn objective(&self, point: &PrimalPoint) -> Result<f64> {
        self.check_point(point)?;
        let forward: f64 = self.choi.iter().zip(point.x.iter()).map(|(j, x)| (j.conj() * x).re).sum();
        let backward: f64 = self.choi.iter().zip(point.x.iter()).map(|(j, x)| (j * x.conj()).re).sum();
        Ok(0.5 * forward + 0.5 * backward)
    }

    /// The constrained block matrix at `point`
    pub fn block_matrix(&self, point: &PrimalPoint) -> Result<Matrix> {
        self.check_point(point)?;
        let n = self.input_dim * self.output_dim;

        let mut block = Array2::zeros((2 * n, 2 * n));
        block.slice_mut(s![..n, ..n]).assign(&self.rho0_block.evaluate(&point.rho0)?);
        block.slice_mut(s![..n, n..]).assign(&point.x);
        block.slice_mut(s![n.., ..n]).assign(&dagger(&point.x));
        block.slice_mut(s![n.., n..]).assign(&self.rho1_block.evaluate(&point.rho1)?);
        Ok(block)
    }

    /// Largest violation among all constraints at `point` (zero if feasible)
    pub fn constraint_violation(&self, point: &PrimalPoint) -> Result<f64> {
        let block = self.block_matrix(point)?;
        let mut violation = (-min_eigenvalue(&block)?).max(0.0);

        for (rho, tr) in [(&point.rho0, &self.rho0_trace), (&point.rho1, &self.rho1_trace)] {
            violation = violation
                .max((tr.evaluate(rho)? - 1.0).norm())
                .max((-min_eigenvalue(rho)?).max(0.0))
                .max(max_abs_diff(rho, &dagger(rho)));
        }

        Ok(violation)
    }

    fn check_dual(&self, y0: &Matrix, y1: &Matrix) -> Result<()> {
        let n = self.input_dim * self.output_dim;
        for y in [y0, y1] {
            if y.dim() != (n, n) {
                return Err(ChannelError::shape("diamond norm dual point", (n, n), y.dim()));
            }
        }
        Ok(())
    }

    /// Dual objective ½ (λmax(Tr_B Y0) + λmax(Tr_B Y1))
    ///
    /// At a dual-feasible point this bounds the optimum from above.
    pub fn dual_objective(&self, y0: &Matrix, y1: &Matrix) -> Result<f64> {
        self.check_dual(y0, y1)?;
        let dims = [self.output_dim, self.input_dim];
        let mut total = 0.0;
        for y in [y0, y1] {
            let reduced = partial_trace(y, &[1], &dims)?;
            total += hermitian_eigen(&reduced)?.eigenvalues.first().copied().unwrap_or(0.0);
        }
        Ok(0.5 * total)
    }

    /// Largest violation of `[[Y0, -J], [-J†, Y1]] ⪰ 0`, `Y0, Y1 ⪰ 0` (zero if feasible)
    pub fn dual_violation(&self, y0: &Matrix, y1: &Matrix) -> Result<f64> {
        self.check_dual(y0, y1)?;
        let n = self.input_dim * self.output_dim;

        let mut block = Array2::zeros((2 * n, 2 * n));
        block.slice_mut(s![..n, ..n]).assign(y0);
        block.slice_mut(s![..n, n..]).assign(&self.choi.mapv(|z| -z));
        block.slice_mut(s![n.., ..n]).assign(&dagger(&self.choi).mapv(|z| -z));
        block.slice_mut(s![n.., n..]).assign(y1);

        let mut violation = (-min_eigenvalue(&block)?).max(0.0);
        for y in [y0, y1] {
            violation = violation
                .max((-min_eigenvalue(y)?).max(0.0))
                .max(max_abs_diff(y, &dagger(y)));
        }
        Ok(violation)
    }
}

/// Diamond norm of the map from dimension `da` to `db` with Choi matrix `choi`
pub fn diamond_norm(choi: &Matrix, da: usize, db: usize) -> Result<f64> {
    diamond_norm_with(choi, da, db, &SeeSawSolver, &SolveOptions::default())
}

/// Diamond norm with an explicit backend and settings
pub fn diamond_norm_with(
    choi: &Matrix,
    da: usize,
    db: usize,
    solver: &dyn SdpSolver,
    options: &SolveOptions,
) -> Result<f64> {
    let program = DiamondNormProgram::new(choi, da, db)?;
    debug!(da, db, tolerance = options.tolerance, "solving diamond norm program");

    let solution = solver.solve(&program, options)?;
    debug!(
        value = solution.value,
        iterations = solution.iterations,
        status = ?solution.status,
        "diamond norm program solved"
    );
    if solution.status == SolveStatus::OptimalInaccurate {
        warn!(
            value = solution.value,
            upper_bound = ?solution.upper_bound,
            "diamond norm returned at reduced accuracy"
        );
    }
    Ok(solution.value)
}

/// Diamond norms of several maps with shared dimensions, solved in parallel
pub fn diamond_norms(chois: &[Matrix], da: usize, db: usize, options: &SolveOptions) -> Vec<Result<f64>> {
    chois
        .par_iter()
        .map(|choi| diamond_norm_with(choi, da, db, &SeeSawSolver, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{c64, max_entangled_matrix};

    #[test]
    fn test_blocks_are_identity_tensor_rho() {
        let err = DiamondNormProgram::new(&max_entangled_matrix(2, false), 2, 3).unwrap_err();
        assert!(matches!(err, ChannelError::ShapeMismatch { .. }));

        let choi = Array2::zeros((6, 6));
        let program = DiamondNormProgram::new(&choi, 2, 3).unwrap();
        let rho = ndarray::array![[c64(0.25, 0.0), c64(0.1, 0.1)], [c64(0.1, -0.1), c64(0.75, 0.0)]];
        let point = PrimalPoint {
            x: Array2::zeros((6, 6)),
            rho0: rho.clone(),
            rho1: rho.clone(),
        };
        let block = program.block_matrix(&point).unwrap();
        let expected = kron(&identity(3), &rho);
        assert!(max_abs_diff(&block.slice(s![..6, ..6]).to_owned(), &expected) < 1e-12);
        assert!(program.constraint_violation(&point).unwrap() < 1e-12);
    }

    #[test]
    fn test_violation_detects_bad_trace() {
        let program = DiamondNormProgram::new(&identity(4), 2, 2).unwrap();
        let point = PrimalPoint {
            x: Array2::zeros((4, 4)),
            rho0: identity(2),
            rho1: identity(2).mapv(|z| z * 0.5),
        };
        assert!((program.constraint_violation(&point).unwrap() - 1.0).abs() < 1e-12);
    }
}
