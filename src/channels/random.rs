//! Random CP maps, channels and POVMs
//!
//! A random map starts from a random bipartite density matrix taken as
//! its Choi matrix, which is then rescaled on the input side (trace
//! preserving), the output side (unital) or alternately on both.

use rand::Rng;
use tracing::debug;

use super::apply::apply_channel;
use super::convert::{choi_to_kraus, choi_to_natural, choi_to_stinespring};
use super::{ChannelRepresentation, RepresentationKind};
use crate::error::{ChannelError, Result};
use crate::linalg::{
    dagger, identity, inv_sqrtm_psd, ket, kron, max_abs_diff, partial_trace, Matrix,
};
use crate::states::random_density_matrix;

/// Smallest eigenvalue accepted when inverting a marginal
const INVERSE_TOL: f64 = 1e-14;
/// Marginal deviation at which the alternating normalisation stops
const SINKHORN_TOL: f64 = 1e-10;
const SINKHORN_MAX_ROUNDS: usize = 1000;

// (C_A^{-1/2} ⊗ I) C (C_A^{-1/2} ⊗ I), making Tr_B C = I_A
fn normalize_input(choi: &Matrix, da: usize, db: usize) -> Result<Matrix> {
    let marginal = partial_trace(choi, &[2], &[da, db])?;
    let factor = kron(&inv_sqrtm_psd(&marginal, INVERSE_TOL)?, &identity(db));
    Ok(factor.dot(choi).dot(&factor))
}

// (I ⊗ C_B^{-1/2}) C (I ⊗ C_B^{-1/2}), making Tr_A C = I_B
fn normalize_output(choi: &Matrix, da: usize, db: usize) -> Result<Matrix> {
    let marginal = partial_trace(choi, &[1], &[da, db])?;
    let factor = kron(&identity(da), &inv_sqrtm_psd(&marginal, INVERSE_TOL)?);
    Ok(factor.dot(choi).dot(&factor))
}

// Operator Sinkhorn scaling towards both marginals being the identity
fn sinkhorn(choi: Matrix, d: usize) -> Result<Matrix> {
    let mut current = choi;
    let mut deviation = f64::INFINITY;

    for round in 1..=SINKHORN_MAX_ROUNDS {
        current = normalize_output(&normalize_input(&current, d, d)?, d, d)?;
        deviation = max_abs_diff(&partial_trace(&current, &[2], &[d, d])?, &identity(d));
        if deviation <= SINKHORN_TOL {
            debug!(round, deviation, "Sinkhorn scaling converged");
            return Ok(current);
        }
    }

    Err(ChannelError::NumericalInstability {
        context: "Sinkhorn scaling of a unital channel",
        deviation,
    })
}

fn represent(choi: Matrix, da: usize, db: usize, kind: RepresentationKind) -> Result<ChannelRepresentation> {
    Ok(match kind {
        RepresentationKind::Choi => ChannelRepresentation::Choi(choi),
        RepresentationKind::Kraus => ChannelRepresentation::Kraus(choi_to_kraus(&choi, da, db)?),
        RepresentationKind::Natural => ChannelRepresentation::Natural(choi_to_natural(&choi, da, db)?),
        RepresentationKind::Stinespring => {
            ChannelRepresentation::Stinespring(choi_to_stinespring(&choi, da, db)?)
        }
    })
}

/// Random CP map from dimension `da` to `db`
///
/// `tp` makes it trace preserving, `unital` makes it unital; both at once
/// need `da == db`.
pub fn random_cp_map<R: Rng + ?Sized>(
    da: usize,
    db: usize,
    tp: bool,
    unital: bool,
    kind: RepresentationKind,
    rng: &mut R,
) -> Result<ChannelRepresentation> {
    if da == 0 || db == 0 {
        return Err(ChannelError::UnsupportedConfiguration(format!(
            "random map between dimensions {} and {}",
            da, db
        )));
    }
    if tp && unital && da != db {
        return Err(ChannelError::UnsupportedConfiguration(format!(
            "a trace-preserving unital map needs equal dimensions, got {} and {}",
            da, db
        )));
    }

    let state = random_density_matrix(da * db, rng);
    let choi = match (tp, unital) {
        (false, false) => state,
        (true, false) => normalize_input(&state, da, db)?,
        (false, true) => normalize_output(&state, da, db)?,
        (true, true) => sinkhorn(state, da)?,
    };

    represent(choi, da, db, kind)
}

/// Random quantum channel (CPTP map)
pub fn random_quantum_channel<R: Rng + ?Sized>(
    da: usize,
    db: usize,
    unital: bool,
    kind: RepresentationKind,
    rng: &mut R,
) -> Result<ChannelRepresentation> {
    random_cp_map(da, db, true, unital, kind, rng)
}

/// Random POVM on a `d`-dimensional space with `num_elem` elements
///
/// With `via_choi` the elements are the diagonal output blocks
/// (I ⊗ ⟨i|) C (I ⊗ |i⟩) of a random channel's Choi matrix. Otherwise
/// they form the pretty-good measurement R^{-1/2} S_i R^{-1/2} of random
/// states S_i with R = Σ_i S_i.
pub fn random_povm<R: Rng + ?Sized>(d: usize, num_elem: usize, via_choi: bool, rng: &mut R) -> Result<Vec<Matrix>> {
    if num_elem == 0 {
        return Err(ChannelError::InvalidMap("a POVM needs at least one element".to_string()));
    }

    if via_choi {
        let choi = random_quantum_channel(d, num_elem, false, RepresentationKind::Choi, rng)?
            .into_choi()
            .ok_or_else(|| ChannelError::InvalidMap("expected a Choi matrix".to_string()))?;

        return (0..num_elem)
            .map(|i| {
                let project = dagger(&kron(&identity(d), &ket(num_elem, i)?));
                apply_channel(&[project], &choi, None, false)
            })
            .collect();
    }

    let states: Vec<Matrix> = (0..num_elem).map(|_| random_density_matrix(d, rng)).collect();
    let total = states.iter().fold(Matrix::zeros((d, d)), |acc, s| acc + s);
    let root = inv_sqrtm_psd(&total, INVERSE_TOL)?;

    Ok(states.iter().map(|s| root.dot(s).dot(&root)).collect())
}
