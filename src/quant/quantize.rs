//! Symmetric quantizer with straight-through gradients

use std::cell::RefCell;
use std::rc::Rc;

use ndarray::ArrayD;
use tracing::debug;

use crate::autograd::{BackwardOp, Tensor};

use super::error::{QuantError, Result};
use super::qtensor::{QData, QTensor};
use super::qtype::{dtype_info, QType};
use super::scale::absmax_scale;

/// Quantize `base` into `qtype` storage paired with a scale.
///
/// When `scale` is omitted the absmax scale over the whole tensor is used
/// (a rank-0 scalar). A supplied non-scalar scale must have exactly one
/// non-unit dimension and the same rank as `base`; anything else is
/// rejected with [`QuantError::InvalidScaleShape`] before any work is done.
///
/// Integer formats round to nearest (`f32::round`, half away from zero,
/// the host default) before clamping into the representable range and
/// casting to storage.
///
/// For gradients, quantization is the identity: the gradient flowing into
/// the quantized output passes through unchanged to `base`, and no
/// gradient flows to the scale.
pub fn quantize(base: &Tensor, qtype: QType, scale: Option<&Tensor>) -> Result<QTensor> {
    let info = dtype_info(qtype);

    let scale = match scale {
        None => absmax_scale(base, qtype, None),
        Some(scale) => {
            if scale.ndim() > 0 {
                let non_unit = scale.shape().iter().filter(|&&d| d != 1).count();
                if non_unit > 1 {
                    return Err(QuantError::InvalidScaleShape {
                        shape: scale.shape().to_vec(),
                        reason: "quantizing along multiple axes is not supported",
                    });
                }
                if scale.ndim() != base.ndim() {
                    return Err(QuantError::InvalidScaleShape {
                        shape: scale.shape().to_vec(),
                        reason: "scale is not broadcastable to the base \
                                 (tip: add missing dims of length one)",
                    });
                }
            }
            scale.clone()
        }
    };

    let mut data = base.data() / scale.data();
    if !qtype.is_floating_point() {
        data.mapv_inplace(f32::round);
    }
    data.mapv_inplace(|v| v.clamp(info.min, info.max));
    let data = QData::from_f32(&data, qtype.dtype(), base.device());

    debug!(
        qtype = qtype.name(),
        shape = ?base.shape(),
        scale_shape = ?scale.shape(),
        "quantized tensor"
    );

    let mut result = QTensor::new(qtype, data, scale)?;
    if base.requires_grad() {
        result.set_requires_grad(true);
        let backward_op = Rc::new(QuantizeBackward {
            base: base.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    Ok(result)
}

struct QuantizeBackward {
    base: Tensor,
    result_grad: Rc<RefCell<Option<ArrayD<f32>>>>,
}

impl BackwardOp for QuantizeBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.base.requires_grad() {
                // Straight-through estimator: the gradient passes through
                // unchanged; nothing flows to qtype or scale
                self.base.accumulate_grad(grad.clone());
            }

            if let Some(op) = self.base.backward_op() {
                op.backward();
            }
        }
    }
}
