// src/channels/mod.rs
//! Quantum channel representations and the operations between them
//!
//! A channel travels through the crate as one of five value types: a list
//! of Kraus operators, a Choi matrix, a natural (superoperator) matrix, a
//! Stinespring isometry, or a transfer matrix in some operator basis.
//! Nothing here mutates its input; every conversion returns a new value.

pub mod algebra;
pub mod apply;
pub mod catalog;
pub mod convert;
pub mod random;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{ChannelError, Result};
use crate::linalg::{dagger, identity, max_abs_diff, Matrix};

pub use algebra::{channel_scalar_multiply, compose_channels, n_channel_uses, tensor_channels};
pub use apply::{apply_channel, ChannelOperand, Subsystems};
pub use catalog::PauliChannel;
pub use convert::{
    choi_representation, choi_to_kraus, choi_to_natural, choi_to_stinespring,
    generate_channel_isometry, natural_representation, transfer_matrix,
};
pub use random::{random_cp_map, random_povm, random_quantum_channel};

/// Isometric extension V = Σ_i K_i ⊗ |i⟩_E, plus a unitary extension when dA = dB
#[derive(Clone, Debug)]
pub struct ChannelIsometry {
    /// (dB·dimE) x dA isometry
    pub isometry: Matrix,
    /// (dA·dimE) x (dA·dimE) unitary, present only for dA = dB
    pub unitary: Option<Matrix>,
}

/// How `transfer_matrix` lays out its coefficients
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferLayout {
    /// A dense dB² x dA² matrix
    #[default]
    Dense,
    /// A map keyed by (output basis index, input basis index)
    Map,
}

/// Coefficients of a channel in an operator basis
#[derive(Clone, Debug)]
pub enum TransferMatrix {
    Dense(Matrix),
    Map(BTreeMap<(usize, usize), Complex64>),
}

impl TransferMatrix {
    /// Coefficient c[i, j], if present
    pub fn get(&self, i: usize, j: usize) -> Option<Complex64> {
        match self {
            TransferMatrix::Dense(m) => m.get((i, j)).copied(),
            TransferMatrix::Map(map) => map.get(&(i, j)).copied(),
        }
    }

    pub fn as_dense(&self) -> Option<&Matrix> {
        match self {
            TransferMatrix::Dense(m) => Some(m),
            TransferMatrix::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<(usize, usize), Complex64>> {
        match self {
            TransferMatrix::Dense(_) => None,
            TransferMatrix::Map(map) => Some(map),
        }
    }
}

/// Which representation a random map should be returned in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepresentationKind {
    #[default]
    Choi,
    Kraus,
    Natural,
    Stinespring,
}

impl FromStr for RepresentationKind {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "choi" => Ok(RepresentationKind::Choi),
            "kraus" => Ok(RepresentationKind::Kraus),
            "natural" => Ok(RepresentationKind::Natural),
            "stinespring" => Ok(RepresentationKind::Stinespring),
            other => Err(ChannelError::UnsupportedConfiguration(format!(
                "unknown representation '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            RepresentationKind::Choi => "choi",
            RepresentationKind::Kraus => "kraus",
            RepresentationKind::Natural => "natural",
            RepresentationKind::Stinespring => "stinespring",
        };
        write!(f, "{}", name)
    }
}

/// A CP map in one of the representations of [`RepresentationKind`]
#[derive(Clone, Debug)]
pub enum ChannelRepresentation {
    Choi(Matrix),
    Kraus(Vec<Matrix>),
    Natural(Matrix),
    Stinespring(Matrix),
}

impl ChannelRepresentation {
    pub fn kind(&self) -> RepresentationKind {
        match self {
            ChannelRepresentation::Choi(_) => RepresentationKind::Choi,
            ChannelRepresentation::Kraus(_) => RepresentationKind::Kraus,
            ChannelRepresentation::Natural(_) => RepresentationKind::Natural,
            ChannelRepresentation::Stinespring(_) => RepresentationKind::Stinespring,
        }
    }

    pub fn into_choi(self) -> Option<Matrix> {
        match self {
            ChannelRepresentation::Choi(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_kraus(self) -> Option<Vec<Matrix>> {
        match self {
            ChannelRepresentation::Kraus(k) => Some(k),
            _ => None,
        }
    }

    pub fn into_natural(self) -> Option<Matrix> {
        match self {
            ChannelRepresentation::Natural(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_stinespring(self) -> Option<Matrix> {
        match self {
            ChannelRepresentation::Stinespring(m) => Some(m),
            _ => None,
        }
    }
}

/// Check a Kraus list is non-empty and uniformly shaped; returns (dB, dA)
pub(crate) fn kraus_dims(kraus: &[Matrix]) -> Result<(usize, usize)> {
    let first = kraus
        .first()
        .ok_or_else(|| ChannelError::InvalidMap("channel must have at least one Kraus operator".to_string()))?;
    let shape = first.dim();

    for op in kraus.iter().skip(1) {
        if op.dim() != shape {
            return Err(ChannelError::shape("Kraus operator list", shape, op.dim()));
        }
    }

    Ok(shape)
}

/// Check Σ K_i† K_i = I within `tol`
pub fn is_trace_preserving(kraus: &[Matrix], tol: f64) -> Result<bool> {
    let (_, da) = kraus_dims(kraus)?;
    let sum = kraus
        .iter()
        .fold(ndarray::Array2::zeros((da, da)), |acc: Matrix, k| acc + dagger(k).dot(k));
    Ok(max_abs_diff(&sum, &identity(da)) <= tol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_representation_kind_parsing() {
        assert_eq!("Kraus".parse::<RepresentationKind>().unwrap(), RepresentationKind::Kraus);
        assert_eq!(RepresentationKind::Stinespring.to_string(), "stinespring");
        assert!(matches!(
            "chi".parse::<RepresentationKind>(),
            Err(ChannelError::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn test_kraus_dims_validation() {
        assert!(kraus_dims(&[]).is_err());
        assert_eq!(kraus_dims(&[identity(2), identity(2)]).unwrap(), (2, 2));
        assert!(kraus_dims(&[identity(2), identity(3)]).is_err());
    }
}
