//! Named channel families
//!
//! Pauli-type channels come back as a [`PauliChannel`] carrying their
//! Kraus operators together with an isometric and a unitary extension;
//! the damping channels return plain Kraus lists.

use itertools::Itertools;
use ndarray::array;
use rand::thread_rng;

use super::convert::generate_channel_isometry;
use crate::error::{validate_prob, ChannelError, Result};
use crate::linalg::basis::{discrete_weyl, discrete_weyl_z, n_qubit_pauli, n_qubit_pauli_x, n_qubit_pauli_z, pauli};
use crate::linalg::{c64, identity, kron, matrix_power, partial_trace, permute_subsystems, Matrix};

/// Slack allowed when the implied identity weight of a Pauli channel is slightly negative
const PROBABILITY_TOL: f64 = 1e-12;

/// Kraus operators of a Pauli-type channel with its Stinespring extensions
#[derive(Clone, Debug)]
pub struct PauliChannel {
    pub kraus: Vec<Matrix>,
    /// Σ_i K_i ⊗ |i⟩_E
    pub isometry: Matrix,
    /// Unitary on system ⊗ environment extending the isometry
    pub unitary: Option<Matrix>,
}

impl PauliChannel {
    fn from_kraus(kraus: Vec<Matrix>, d: usize) -> Result<Self> {
        let extension = generate_channel_isometry(&kraus, d, d, &mut thread_rng())?;
        Ok(PauliChannel {
            kraus,
            isometry: extension.isometry,
            unitary: extension.unitary,
        })
    }
}

fn weighted(op: Matrix, p: f64) -> Matrix {
    let w = p.sqrt();
    op.mapv(|z| z * w)
}

fn validate_distribution(probs: &[f64], expected_len: usize, context: &'static str) -> Result<()> {
    if probs.len() != expected_len {
        return Err(ChannelError::dimension(context, expected_len, probs.len()));
    }
    probs.iter().try_for_each(|&p| validate_prob(p))
}

// All length-n strings over 0..base, last digit fastest
fn digit_strings(n: usize, base: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    (0..n).map(|_| 0..base).multi_cartesian_product().collect()
}

fn too_many_qubits(context: &str, n: usize) -> ChannelError {
    ChannelError::UnsupportedConfiguration(format!("{}: {} qubits exceed the addressable dimension", context, n))
}

// 2^n, checked against usize overflow
fn qubit_dim(n: usize, context: &str) -> Result<usize> {
    u32::try_from(n)
        .ok()
        .and_then(|bits| 1usize.checked_shl(bits))
        .ok_or_else(|| too_many_qubits(context, n))
}

/// Qubit Pauli channel ρ ↦ pI ρ + px XρX + py YρY + pz ZρZ with pI = 1 - px - py - pz
pub fn pauli_channel(px: f64, py: f64, pz: f64) -> Result<PauliChannel> {
    for p in [px, py, pz] {
        validate_prob(p)?;
    }
    let pi = 1.0 - px - py - pz;
    if pi < -PROBABILITY_TOL {
        return Err(ChannelError::InvalidProbability(pi));
    }

    let kraus = [pi.max(0.0), px, py, pz]
        .iter()
        .enumerate()
        .map(|(k, &p)| Ok(weighted(pauli(k)?, p)))
        .collect::<Result<Vec<_>>>()?;

    PauliChannel::from_kraus(kraus, 2)
}

/// Qubit depolarising channel ρ ↦ (1-p)ρ + p Tr(ρ) I/2, i.e. px = py = pz = p/4
pub fn depolarizing_channel(p: f64) -> Result<PauliChannel> {
    validate_prob(p)?;
    pauli_channel(p / 4.0, p / 4.0, p / 4.0)
}

/// ρ ↦ (1-p)ρ + p XρX
pub fn bit_flip_channel(p: f64) -> Result<PauliChannel> {
    pauli_channel(p, 0.0, 0.0)
}

/// ρ ↦ (1-p)ρ + p ZρZ
pub fn dephasing_channel(p: f64) -> Result<PauliChannel> {
    pauli_channel(0.0, 0.0, p)
}

/// Qudit dephasing with Kraus operators √p_k Z^k, one probability per level
pub fn qudit_dephasing_channel(probs: &[f64]) -> Result<Vec<Matrix>> {
    let d = probs.len();
    if d == 0 {
        return Err(ChannelError::InvalidMap("dephasing channel needs at least one probability".to_string()));
    }
    validate_distribution(probs, d, "qudit_dephasing_channel")?;

    let z = discrete_weyl_z(d);
    probs
        .iter()
        .enumerate()
        .map(|(k, &p)| Ok(weighted(matrix_power(&z, k)?, p)))
        .collect()
}

/// Removes every off-diagonal entry in the standard basis
pub fn completely_dephasing_channel(d: usize) -> Result<Vec<Matrix>> {
    qudit_dephasing_channel(&vec![1.0 / d as f64; d])
}

/// Channel of the BB84 protocol with equal bit and phase error rate `q`
pub fn bb84_channel(q: f64) -> Result<PauliChannel> {
    validate_prob(q)?;
    pauli_channel(q - q * q, q * q, q - q * q)
}

/// n-qubit Pauli channel from 4^n probabilities
///
/// By default the operators are √p_s P_s over Pauli strings s, ordered
/// with the first qubit most significant. With `alt_repr` they are
/// √p_{a,b} X^a Z^b over bit strings a (outer) and b (inner).
pub fn pauli_channel_n_qubit(n: usize, probs: &[f64], alt_repr: bool) -> Result<PauliChannel> {
    let d = qubit_dim(n, "pauli_channel_n_qubit")?;
    let count = d.checked_mul(d).ok_or_else(|| too_many_qubits("pauli_channel_n_qubit", n))?;
    validate_distribution(probs, count, "pauli_channel_n_qubit probabilities")?;

    let kraus = if alt_repr {
        let strings = digit_strings(n, 2);
        strings
            .iter()
            .cartesian_product(strings.iter())
            .zip(probs)
            .map(|((a, b), &p)| Ok(weighted(n_qubit_pauli_x(a)?.dot(&n_qubit_pauli_z(b)?), p)))
            .collect::<Result<Vec<_>>>()?
    } else {
        digit_strings(n, 4)
            .iter()
            .zip(probs)
            .map(|(s, &p)| Ok(weighted(n_qubit_pauli(s)?, p)))
            .collect::<Result<Vec<_>>>()?
    };

    PauliChannel::from_kraus(kraus, d)
}

/// n-qubit depolarising channel: weight 1 - p on the identity, p spread evenly over the other Pauli strings
pub fn depolarizing_channel_n_qubits(n: usize, p: f64) -> Result<PauliChannel> {
    validate_prob(p)?;
    let count = n
        .checked_mul(2)
        .ok_or_else(|| too_many_qubits("depolarizing_channel_n_qubits", n))
        .and_then(|bits| qubit_dim(bits, "depolarizing_channel_n_qubits"))?;
    let rest = if count > 1 { p / (count - 1) as f64 } else { 0.0 };
    let probs: Vec<f64> = std::iter::once(1.0 - p)
        .chain(std::iter::repeat(rest).take(count - 1))
        .collect();
    pauli_channel_n_qubit(n, &probs, true)
}

/// Qudit Pauli channel with Kraus operators √p W(z, x), z outer and x inner
pub fn pauli_channel_qudit(d: usize, probs: &[f64]) -> Result<PauliChannel> {
    validate_distribution(probs, d * d, "pauli_channel_qudit probabilities")?;

    let kraus = (0..d)
        .cartesian_product(0..d)
        .zip(probs)
        .map(|((z, x), &p)| Ok(weighted(discrete_weyl(d, z, x)?, p)))
        .collect::<Result<Vec<_>>>()?;

    PauliChannel::from_kraus(kraus, d)
}

pub fn phase_damping_channel(p: f64) -> Result<Vec<Matrix>> {
    validate_prob(p)?;
    let zero = c64(0.0, 0.0);
    Ok(vec![
        array![[c64(1.0, 0.0), zero], [zero, c64(p.sqrt(), 0.0)]],
        array![[zero, zero], [zero, c64((1.0 - p).sqrt(), 0.0)]],
    ])
}

/// Decay |1⟩ → |0⟩ with probability `gamma`
pub fn amplitude_damping_channel(gamma: f64) -> Result<Vec<Matrix>> {
    validate_prob(gamma)?;
    let zero = c64(0.0, 0.0);
    Ok(vec![
        array![[c64(1.0, 0.0), zero], [zero, c64((1.0 - gamma).sqrt(), 0.0)]],
        array![[zero, c64(gamma.sqrt(), 0.0)], [zero, zero]],
    ])
}

/// Amplitude damping towards a thermal state with excited population `n`
pub fn generalized_amplitude_damping_channel(gamma: f64, n: f64) -> Result<Vec<Matrix>> {
    validate_prob(gamma)?;
    validate_prob(n)?;
    let zero = c64(0.0, 0.0);

    let excite = vec![
        array![[c64((1.0 - gamma).sqrt(), 0.0), zero], [zero, c64(1.0, 0.0)]],
        array![[zero, zero], [c64(gamma.sqrt(), 0.0), zero]],
    ];

    if n == 0.0 {
        return amplitude_damping_channel(gamma);
    }
    if n == 1.0 {
        return Ok(excite);
    }

    let relax = amplitude_damping_channel(gamma)?;
    Ok(relax
        .into_iter()
        .map(|k| weighted(k, 1.0 - n))
        .chain(excite.into_iter().map(|k| weighted(k, n)))
        .collect())
}

/// Output of the qubit depolarising channel applied to the last `n` of `m` qubits of `rho`
///
/// With the convention of [`depolarizing_channel`] this is the expansion
/// over subsets S of the affected qubits,
/// Σ_S p^|S| (1 - p)^(n-|S|) (I/2^|S|)_S ⊗ Tr_S ρ,
/// with every term permuted back to the original qubit order.
pub fn depolarizing_channel_n_uses(p: f64, n: usize, rho: &Matrix, m: usize) -> Result<Matrix> {
    validate_prob(p)?;
    if n > m {
        return Err(ChannelError::InvalidSubsystems(format!(
            "cannot depolarise {} of {} qubits",
            n, m
        )));
    }
    let total = qubit_dim(m, "depolarizing_channel_n_uses")?;
    if rho.dim() != (total, total) {
        return Err(ChannelError::shape("depolarizing_channel_n_uses", (total, total), rho.dim()));
    }

    let dims = vec![2; m];
    let offset = m - n;

    (0..=n)
        .flat_map(|k| (1..=n).combinations(k))
        .try_fold(Matrix::zeros((total, total)), |acc, subset| -> Result<Matrix> {
            let k = subset.len();
            let traced: Vec<usize> = subset.iter().map(|s| s + offset).collect();
            let weight = p.powi(k as i32) * (1.0 - p).powi((n - k) as i32);

            let rest = partial_trace(rho, &traced, &dims)?;
            let mix = identity(1 << k).mapv(|z| z / (1u64 << k) as f64);
            let arranged = kron(&mix, &rest);

            let order: Vec<usize> = traced
                .iter()
                .copied()
                .chain((1..=m).filter(|s| !traced.contains(s)))
                .collect();
            let perm: Vec<usize> = (1..=m)
                .map(|s| order.iter().position(|&o| o == s).map_or(0, |pos| pos + 1))
                .collect();
            let restored = permute_subsystems(&arranged, &perm, &dims)?;

            Ok(acc + restored.mapv(|z| z * weight))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::is_trace_preserving;

    #[test]
    fn test_pauli_channel_probabilities() {
        assert!(matches!(pauli_channel(0.5, 0.4, 0.3), Err(ChannelError::InvalidProbability(_))));
        assert!(matches!(pauli_channel(-0.1, 0.0, 0.0), Err(ChannelError::InvalidProbability(_))));
        let ch = pauli_channel(0.1, 0.2, 0.3).unwrap();
        assert_eq!(ch.kraus.len(), 4);
        assert!(is_trace_preserving(&ch.kraus, 1e-12).unwrap());
    }

    #[test]
    fn test_generalized_amplitude_damping_counts() {
        assert_eq!(generalized_amplitude_damping_channel(0.3, 0.0).unwrap().len(), 2);
        assert_eq!(generalized_amplitude_damping_channel(0.3, 1.0).unwrap().len(), 2);
        let four = generalized_amplitude_damping_channel(0.3, 0.4).unwrap();
        assert_eq!(four.len(), 4);
        assert!(is_trace_preserving(&four, 1e-12).unwrap());
    }

    #[test]
    fn test_pauli_qudit_length_check() {
        assert!(matches!(
            pauli_channel_qudit(3, &[1.0]),
            Err(ChannelError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_depolarizing_n_uses_requires_room() {
        assert!(depolarizing_channel_n_uses(0.1, 3, &identity(4), 2).is_err());
    }

    #[test]
    fn test_qubit_counts_beyond_usize() {
        let unsupported = |r: Result<()>| matches!(r, Err(ChannelError::UnsupportedConfiguration(_)));
        assert!(unsupported(pauli_channel_n_qubit(64, &[1.0], false).map(|_| ())));
        assert!(unsupported(pauli_channel_n_qubit(32, &[1.0], true).map(|_| ())));
        assert!(unsupported(depolarizing_channel_n_qubits(32, 0.1).map(|_| ())));
        assert!(unsupported(depolarizing_channel_n_uses(0.1, 1, &identity(2), 64).map(|_| ())));
        assert_eq!(qubit_dim(3, "test").unwrap(), 8);
    }
}
