//! Dequantizer: reconstruct an approximate f32 tensor

use std::cell::RefCell;
use std::rc::Rc;

use ndarray::ArrayD;
use tracing::debug;

use crate::autograd::{BackwardOp, Tensor};

use super::qtensor::QTensor;

impl QTensor {
    /// Reconstruct an approximate f32 tensor as `data * scale`.
    ///
    /// Integer storage promotes to f32 during the multiply; f16 storage is
    /// upcast to the scale dtype first. The scale broadcasts against the
    /// data along its single non-unit dimension (or everywhere, when
    /// scalar). Shape compatibility is a construction invariant and is not
    /// re-checked here.
    ///
    /// For gradients, dequantization is the identity: the gradient flowing
    /// into the result passes through unchanged to this value's data
    /// component, and no gradient flows to the scale.
    pub fn dequantize(&self) -> Tensor {
        let data = self.data().to_f32() * self.scale();

        debug!(
            qtype = self.qtype().name(),
            shape = ?self.shape(),
            "dequantized tensor"
        );

        let mut result = Tensor::on_device(data, self.requires_grad(), self.device());
        if self.requires_grad() {
            let backward_op = Rc::new(DequantizeBackward {
                q: self.clone(),
                result_grad: result.grad_cell(),
            });
            result.set_backward_op(backward_op);
        }

        result
    }
}

struct DequantizeBackward {
    q: QTensor,
    result_grad: Rc<RefCell<Option<ArrayD<f32>>>>,
}

impl BackwardOp for DequantizeBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            // Identity pass-through; no gradient to the scale
            self.q.accumulate_grad(grad.clone());

            if let Some(op) = self.q.backward_op() {
                op.backward();
            }
        }
    }
}
