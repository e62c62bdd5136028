//! Composition, tensor products, repeated uses and scaling of Kraus maps
//!
//! Products over several Kraus lists enumerate index tuples with the last
//! list varying fastest.

use itertools::Itertools;
use tracing::trace;

use super::kraus_dims;
use crate::error::{ChannelError, Result};
use crate::linalg::{identity, kron_all, Matrix};

/// Kraus operators of N_k ∘ ... ∘ N_1 for `channels = [N_1, ..., N_k]`
///
/// Every composite is `K_{k,i_k} ... K_{1,i_1}`, giving Π |K_j| operators.
/// The output dimension of each map must match the input of the next.
pub fn compose_channels(channels: &[Vec<Matrix>]) -> Result<Vec<Matrix>> {
    let dims = channels
        .iter()
        .map(|k| kraus_dims(k))
        .collect::<Result<Vec<_>>>()?;
    let (_, input_dim) = *dims
        .first()
        .ok_or_else(|| ChannelError::InvalidMap("composition of zero channels".to_string()))?;

    // each channel must accept what the previous one outputs
    for pair in dims.windows(2) {
        let (out_dim, _) = pair[0];
        let (_, next_in) = pair[1];
        if out_dim != next_in {
            return Err(ChannelError::dimension("compose_channels chain", next_in, out_dim));
        }
    }

    trace!(count = channels.len(), "composing channels");
    Ok(channels
        .iter()
        .map(|k| 0..k.len())
        .multi_cartesian_product()
        .map(|choice| {
            choice
                .iter()
                .zip(channels)
                .fold(identity(input_dim), |acc, (&i, k)| k[i].dot(&acc))
        })
        .collect())
}

/// Kraus operators of N_1 ⊗ ... ⊗ N_k, each composite a Kronecker product in list order
pub fn tensor_channels(channels: &[Vec<Matrix>]) -> Result<Vec<Matrix>> {
    if channels.is_empty() {
        return Err(ChannelError::InvalidMap("tensor product of zero channels".to_string()));
    }
    for k in channels {
        kraus_dims(k)?;
    }

    Ok(channels
        .iter()
        .map(|k| 0..k.len())
        .multi_cartesian_product()
        .map(|choice| kron_all(choice.iter().zip(channels).map(|(&i, k)| &k[i])))
        .collect())
}

/// Kraus operators of N^{⊗n}
///
/// For `n = 0` this is the trivial map on a one-dimensional space.
pub fn n_channel_uses(kraus: &[Matrix], n: usize) -> Result<Vec<Matrix>> {
    kraus_dims(kraus)?;
    if n == 0 {
        return Ok(vec![identity(1)]);
    }
    tensor_channels(&vec![kraus.to_vec(); n])
}

/// Kraus operators of x·N for x ≥ 0, scaling each operator by √x
pub fn channel_scalar_multiply(kraus: &[Matrix], x: f64) -> Result<Vec<Matrix>> {
    kraus_dims(kraus)?;
    if !(x >= 0.0) || !x.is_finite() {
        return Err(ChannelError::InvalidMap(format!(
            "scalar {} does not give a completely positive map",
            x
        )));
    }

    let factor = x.sqrt();
    Ok(kraus.iter().map(|k| k.mapv(|z| z * factor)).collect())
}
