//! cuantizar: differentiable symmetric quantization of tensors
//!
//! Quantization maps a high-precision tensor to a low-bit representation
//! plus a scale factor (`original ≈ quantized * scale`); dequantization is
//! the approximate inverse. Both directions are differentiable via the
//! straight-through estimator: gradients pass through unchanged, so
//! quantized values compose with gradient-based optimization.
//!
//! ```
//! use cuantizar::{quantize, Tensor, QINT8};
//!
//! let base = Tensor::from_vec(vec![-5.0, 0.0, 5.0], false);
//! let q = quantize(&base, QINT8, None).unwrap();
//! let restored = q.dequantize();
//! assert!((restored.data()[[0]] - (-5.0)).abs() < 0.05);
//! ```
//!
//! Scales are computed from the maximum absolute value
//! ([`absmax_scale`]), either per-tensor (scalar) or per-axis (one
//! non-unit dimension). Per-axis scales broadcast against the quantized
//! data; the resolved axis is exposed through [`QTensor::axis`] for
//! downstream kernel selection.

pub mod autograd;
pub mod quant;

pub use autograd::{add, backward, mul, sum, BackwardOp, Device, Tensor};
pub use quant::{
    absmax_scale, dtype_info, qfallback, quantize, DType, DTypeInfo, OpArg, OpRegistry, QData,
    QOpHandler, QTensor, QTensorPart, QType, QuantAxis, QuantError, QFLOAT16, QINT2, QINT4, QINT8,
    QUINT8,
};
