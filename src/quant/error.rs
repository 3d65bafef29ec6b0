//! Quantization error taxonomy

use thiserror::Error;

use crate::autograd::Device;

/// Errors surfaced by quantization, construction, and reconstruction.
///
/// All variants are eager boundary validation failures: an operation either
/// fully succeeds or fails atomically with no side effects. Nothing is
/// retried or recovered mid-operation.
#[derive(Debug, Error)]
pub enum QuantError {
    /// Supplied scale cannot drive quantization of the base tensor.
    #[error("invalid scale shape {shape:?}: {reason}")]
    InvalidScaleShape {
        shape: Vec<usize>,
        reason: &'static str,
    },

    /// Scale has more than one non-unit dimension.
    #[error("cannot quantize along multiple axes (scale shape {0:?})")]
    MultiAxisUnsupported(Vec<usize>),

    /// Scale rank does not match data rank.
    #[error("scale of rank {scale_ndim} is not broadcastable to data of rank {data_ndim} (tip: add missing dims of length one)")]
    NotBroadcastable { scale_ndim: usize, data_ndim: usize },

    /// Data and scale reside on different compute devices.
    #[error("data resides on {data} but scale resides on {scale}")]
    DeviceMismatch { data: Device, scale: Device },

    /// Flatten/unflatten contract violated.
    #[error("malformed flat representation: {0}")]
    MalformedFlatRepresentation(String),
}

/// Result type for quantization operations.
pub type Result<T> = std::result::Result<T, QuantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_invariant() {
        let err = QuantError::MultiAxisUnsupported(vec![2, 3]);
        assert!(format!("{err}").contains("multiple axes"));

        let err = QuantError::NotBroadcastable {
            scale_ndim: 1,
            data_ndim: 2,
        };
        assert!(format!("{err}").contains("not broadcastable"));

        let err = QuantError::DeviceMismatch {
            data: Device::Cpu,
            scale: Device::Cuda(0),
        };
        let msg = format!("{err}");
        assert!(msg.contains("cpu"));
        assert!(msg.contains("cuda:0"));

        let err = QuantError::MalformedFlatRepresentation("missing qtype".into());
        assert!(format!("{err}").contains("missing qtype"));
    }
}
