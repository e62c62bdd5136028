//! Error types for channel conversions, application and optimisation
//!
//! Every fallible operation in the crate returns [`Result`]. Solver
//! failures keep their own enum so that callers can match on the status a
//! backend reported without digging through strings.

use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a [`ChannelError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operator or vector shapes disagree with the declared dimensions
    DimensionMismatch,
    /// Empty or structurally invalid Kraus/Choi input
    InvalidMap,
    /// A decomposition failed or produced a result outside tolerance
    NumericalInstability,
    /// A basis, representation or map class that cannot be produced
    UnsupportedConfiguration,
    /// The optimisation backend did not return an optimal point
    Solver,
}

/// Errors raised by the optimisation backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The returned point violates the program's constraints
    #[error("solver returned an infeasible point (constraint violation {violation:.3e})")]
    Infeasible { violation: f64 },

    /// The objective diverged
    #[error("objective is unbounded")]
    Unbounded,

    /// The iteration budget ran out before the objective settled
    #[error("solver did not converge after {iterations} iterations (last change {change:.3e})")]
    NotConverged { iterations: usize, change: f64 },

    /// The wall-clock budget ran out
    #[error("solver timed out after {elapsed:?} ({iterations} iterations)")]
    TimedOut { elapsed: Duration, iterations: usize },

    /// A decomposition inside the solver failed
    #[error("numerical failure inside solver: {0}")]
    NumericalFailure(String),
}

/// Errors related to quantum channel representations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    /// A scalar dimension does not match what the operation expects
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    /// A matrix has the wrong shape
    #[error("shape mismatch in {context}: expected {}x{}, found {}x{}", expected.0, expected.1, found.0, found.1)]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Subsystem indices are out of range, repeated or empty
    #[error("invalid subsystem selection: {0}")]
    InvalidSubsystems(String),

    /// Empty or structurally invalid map
    #[error("invalid map: {0}")]
    InvalidMap(String),

    /// The Choi matrix has a negative eigenvalue beyond tolerance
    #[error("map is not completely positive: Choi matrix has eigenvalue {eigenvalue:.3e}")]
    NotCompletelyPositive { eigenvalue: f64 },

    /// The probability is invalid (not between 0.0 and 1.0)
    #[error("invalid probability: {0}. Must be between 0.0 and 1.0")]
    InvalidProbability(f64),

    /// A decomposition did not reach the required accuracy
    #[error("numerical instability in {context} (deviation {deviation:.3e})")]
    NumericalInstability {
        context: &'static str,
        deviation: f64,
    },

    /// Requested something the crate cannot build
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// The optimisation backend failed
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),
}

impl ChannelError {
    /// Map the error onto its category
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChannelError::DimensionMismatch { .. }
            | ChannelError::ShapeMismatch { .. }
            | ChannelError::InvalidSubsystems(_) => ErrorKind::DimensionMismatch,
            ChannelError::InvalidMap(_)
            | ChannelError::NotCompletelyPositive { .. }
            | ChannelError::InvalidProbability(_) => ErrorKind::InvalidMap,
            ChannelError::NumericalInstability { .. } => ErrorKind::NumericalInstability,
            ChannelError::UnsupportedConfiguration(_) => ErrorKind::UnsupportedConfiguration,
            ChannelError::Solver(_) => ErrorKind::Solver,
        }
    }

    pub(crate) fn shape(context: &'static str, expected: (usize, usize), found: (usize, usize)) -> Self {
        ChannelError::ShapeMismatch {
            context,
            expected,
            found,
        }
    }

    pub(crate) fn dimension(context: &'static str, expected: usize, found: usize) -> Self {
        ChannelError::DimensionMismatch {
            context,
            expected,
            found,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Reject probabilities outside `[0, 1]`
pub(crate) fn validate_prob(p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ChannelError::InvalidProbability(p));
    }
    Ok(())
}
