//! Quantum Channel Representations
//!
//! This crate converts completely positive maps between their Kraus,
//! Choi, natural, Stinespring and transfer-matrix representations, applies
//! them to whole systems or chosen subsystems, composes and tensors them,
//! and evaluates the diamond norm through a semidefinite program. A catalog
//! of named channel families and random generators is included.

pub mod error;
pub mod linalg;
pub mod states;
pub mod channels;
pub mod optimize;

// Create a prelude module for convenient imports
pub mod prelude {
    pub use crate::channels::catalog::*;
    pub use crate::channels::{
        apply_channel, channel_scalar_multiply, choi_representation, choi_to_kraus, choi_to_natural,
        choi_to_stinespring, compose_channels, generate_channel_isometry, is_trace_preserving,
        n_channel_uses, natural_representation, random_cp_map, random_povm, random_quantum_channel,
        tensor_channels, transfer_matrix, ChannelIsometry, ChannelRepresentation, RepresentationKind,
        Subsystems, TransferLayout, TransferMatrix,
    };
    pub use crate::error::{ChannelError, ErrorKind, Result, SolverError};
    pub use crate::linalg::basis::OperatorBasis;
    pub use crate::linalg::{Matrix, Vector};
    pub use crate::optimize::{diamond_norm, diamond_norm_with, diamond_norms, SeeSawSolver, SolveOptions};
    pub use crate::states::{random_density_matrix, random_state_vector};
}

// Version and crate information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
