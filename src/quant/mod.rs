//! Differentiable symmetric quantization
//!
//! Converts f32 tensors into low-bit storage paired with a scale factor
//! such that `original ≈ quantized * scale`, and back. The scale is either
//! a single scalar (per-tensor) or has one non-unit dimension (per-axis).
//! Both transforms are identity functions for gradient propagation, the
//! straight-through estimator, so quantized values stay usable under
//! gradient-based optimization.

mod dequantize;
mod dispatch;
mod error;
mod qtensor;
mod qtype;
mod quantize;
mod scale;


pub use dispatch::{qfallback, OpArg, OpRegistry, QOpHandler};
pub use error::{QuantError, Result};
pub use qtensor::{QData, QTensor, QTensorPart, QValues, QuantAxis};
pub use qtype::{dtype_info, DType, DTypeInfo, QType, QFLOAT16, QINT2, QINT4, QINT8, QUINT8};
pub use quantize::quantize;
pub use scale::{absmax_scale, MIN_SCALE};
