//! Block-coordinate ascent for the diamond-norm program
//!
//! Every feasible X can be written `X = (I ⊗ S0) K (I ⊗ S1)` with
//! `‖K‖ ≤ 1` and `ρk = Sk²`, `Tr ρk = 1`. The solver alternates exact
//! maximisation over K (a polar decomposition), S0 and S1, each of which
//! cannot decrease the objective.
//!
//! Progress alone does not bound the distance to the optimum, so once the
//! ascent slows down the solver builds a dual-feasible point from the
//! current factors. For invertible `R0`, `R1` and
//! `M = (I ⊗ R0^½) J (I ⊗ R1^½)` the pair
//!
//! ```text
//! Y0 = (I ⊗ R0^-½) |M†| (I ⊗ R0^-½),   Y1 = (I ⊗ R1^-½) |M| (I ⊗ R1^-½)
//! ```
//!
//! satisfies the dual constraints, and its objective is an upper bound.
//! The solver stops when the gap to that bound is within tolerance.

use std::time::Instant;

use tracing::{debug, info, trace};

use super::{DiamondNormProgram, PrimalPoint, SdpSolution, SdpSolver, SolveOptions, SolveStatus};
use crate::error::{ChannelError, SolverError};
use crate::linalg::{
    dagger, frobenius_norm, hermitian_eigen, hermitian_part, identity, kron, partial_trace,
    polar_decomposition, positive_part, spectral_map, sqrtm_psd, Matrix,
};

/// Shifts `R = S² + shift·I` tried when building dual points; singular factors skip the zero shift
const DUAL_SHIFTS: [f64; 6] = [0.0, 1e-12, 1e-10, 1e-8, 1e-6, 1e-4];
/// Smallest eigenvalue of a shifted factor that is still inverted
const MIN_INVERTIBLE: f64 = 1e-13;
/// Relative tolerance for the PSD square roots of `M M†` and `M† M`
const SQRT_TOL: f64 = 1e-8;

/// See-saw primal ascent with a dual certificate, the default diamond-norm backend
#[derive(Clone, Copy, Debug, Default)]
pub struct SeeSawSolver;

fn numerical(err: ChannelError) -> SolverError {
    SolverError::NumericalFailure(err.to_string())
}

// Best unit-Frobenius PSD factor against the gradient `h`; keeps `current` if h has no positive part
fn update_factor(h: &Matrix, current: &Matrix) -> Result<Matrix, SolverError> {
    let positive = positive_part(&hermitian_part(h)).map_err(numerical)?;
    let norm = frobenius_norm(&positive);
    if !norm.is_finite() {
        return Err(SolverError::NumericalFailure("non-finite factor update".to_string()));
    }
    if norm <= f64::EPSILON {
        return Ok(current.clone());
    }
    Ok(positive.mapv(|z| z / norm))
}

// (R^½, R^-½) for R = S² + shift·I, or None if R is numerically singular
fn shifted_roots(s: &Matrix, shift: f64) -> Result<Option<(Matrix, Matrix)>, SolverError> {
    let r = s.dot(s) + &identity(s.nrows()).mapv(|z| z * shift);
    let eig = hermitian_eigen(&r).map_err(numerical)?;
    match eig.eigenvalues.last() {
        Some(&lowest) if lowest > MIN_INVERTIBLE => Ok(Some((
            spectral_map(&eig, f64::sqrt),
            spectral_map(&eig, |l| 1.0 / l.sqrt()),
        ))),
        _ => Ok(None),
    }
}

/// Dual-feasible point built from the factors `s0`, `s1` with a given shift
fn dual_point(
    program: &DiamondNormProgram,
    s0: &Matrix,
    s1: &Matrix,
    shift: f64,
) -> Result<Option<(Matrix, Matrix)>, SolverError> {
    let (r0, r1) = match (shifted_roots(s0, shift)?, shifted_roots(s1, shift)?) {
        (Some(r0), Some(r1)) => (r0, r1),
        _ => return Ok(None),
    };

    let id_b = identity(program.output_dim());
    let m = kron(&id_b, &r0.0).dot(program.choi()).dot(&kron(&id_b, &r1.0));
    let left = sqrtm_psd(&m.dot(&dagger(&m)), SQRT_TOL).map_err(numerical)?;
    let right = sqrtm_psd(&dagger(&m).dot(&m), SQRT_TOL).map_err(numerical)?;

    let w0 = kron(&id_b, &r0.1);
    let w1 = kron(&id_b, &r1.1);
    Ok(Some((w0.dot(&left).dot(&w0), w1.dot(&right).dot(&w1))))
}

// Smallest dual objective over the shifted dual points
fn upper_bound(program: &DiamondNormProgram, s0: &Matrix, s1: &Matrix) -> Result<f64, SolverError> {
    let mut best = f64::INFINITY;
    for &shift in &DUAL_SHIFTS {
        if let Some((y0, y1)) = dual_point(program, s0, s1, shift)? {
            let bound = program.dual_objective(&y0, &y1).map_err(numerical)?;
            if bound.is_finite() {
                best = best.min(bound);
            }
        }
    }
    Ok(best)
}

impl SdpSolver for SeeSawSolver {
    fn solve(&self, program: &DiamondNormProgram, options: &SolveOptions) -> Result<SdpSolution, SolverError> {
        let start = Instant::now();
        let (da, db) = (program.input_dim(), program.output_dim());
        let j = program.choi();
        let j_dag = dagger(j);
        let id_b = identity(db);

        let mixed = identity(da).mapv(|z| z / (da as f64).sqrt());
        let mut s0 = mixed.clone();
        let mut s1 = mixed;
        let mut previous = f64::NEG_INFINITY;
        let mut change = f64::INFINITY;

        debug!(da, db, max_iterations = options.max_iterations, "starting see-saw ascent");

        for iteration in 1..=options.max_iterations {
            if let Some(limit) = options.timeout {
                let elapsed = start.elapsed();
                if elapsed >= limit {
                    return Err(SolverError::TimedOut {
                        elapsed,
                        iterations: iteration - 1,
                    });
                }
            }

            let p0 = kron(&id_b, &s0);
            let p1 = kron(&id_b, &s1);
            let (k, value) = polar_decomposition(&p0.dot(j).dot(&p1)).map_err(numerical)?;
            if value.is_infinite() {
                return Err(SolverError::Unbounded);
            }
            if value.is_nan() {
                return Err(SolverError::NumericalFailure(format!(
                    "objective became NaN at iteration {}",
                    iteration
                )));
            }

            change = (value - previous).abs();
            if options.verbose {
                info!(iteration, value, change, "see-saw sweep");
            } else {
                trace!(iteration, value, change, "see-saw sweep");
            }

            let scale = value.abs().max(1.0);
            if change <= options.tolerance * scale {
                let bound = upper_bound(program, &s0, &s1)?;
                let stalled = change <= options.tolerance * options.tolerance * scale;
                if bound - value <= options.tolerance * scale || stalled {
                    let point = PrimalPoint {
                        x: p0.dot(&k).dot(&p1),
                        rho0: s0.dot(&s0),
                        rho1: s1.dot(&s1),
                    };
                    return finish(program, options, point, bound, iteration);
                }
                trace!(iteration, value, bound, "duality gap above tolerance");
            }
            previous = value;

            s0 = update_factor(
                &partial_trace(&k.dot(&p1).dot(&j_dag), &[1], &[db, da]).map_err(numerical)?,
                &s0,
            )?;
            let p0 = kron(&id_b, &s0);
            s1 = update_factor(
                &partial_trace(&j_dag.dot(&p0).dot(&k), &[1], &[db, da]).map_err(numerical)?,
                &s1,
            )?;
        }

        Err(SolverError::NotConverged {
            iterations: options.max_iterations,
            change,
        })
    }
}

// Re-check the point against the program and classify it
fn finish(
    program: &DiamondNormProgram,
    options: &SolveOptions,
    point: PrimalPoint,
    bound: f64,
    iterations: usize,
) -> Result<SdpSolution, SolverError> {
    let value = program.objective(&point).map_err(numerical)?;
    let violation = program.constraint_violation(&point).map_err(numerical)?;
    let scale = value.abs().max(1.0);
    let gap = bound - value;

    let status = if violation <= options.tolerance * scale && gap <= options.tolerance * scale {
        SolveStatus::Optimal
    } else if violation <= options.feasibility_tolerance * scale {
        SolveStatus::OptimalInaccurate
    } else {
        return Err(SolverError::Infeasible { violation });
    };

    debug!(value, gap, violation, iterations, status = ?status, "see-saw ascent finished");
    Ok(SdpSolution {
        status,
        value,
        upper_bound: bound.is_finite().then_some(bound),
        point,
        iterations,
    })
}
