//! Tape-based autograd layer over ndarray
//!
//! Provides the differentiation mechanism the quantization kernels plug
//! into: tensors carry a shared gradient cell and an optional backward op,
//! and [`backward`] walks the resulting graph. Custom forward/backward
//! pairs (the quantizer and dequantizer) register themselves by attaching
//! a [`BackwardOp`] to their output.

mod backward;
mod device;
mod ops;
mod tensor;

#[cfg(test)]
mod tests;

pub use backward::BackwardOp;
pub use device::Device;
pub use ops::{add, mul, sum};
pub use tensor::Tensor;

/// Perform backward pass on a tensor.
///
/// Seeds the tensor's gradient with `grad_output`, or with ones when no
/// gradient is given (the scalar-loss convention).
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::ArrayD<f32>>) {
    if let Some(grad) = grad_output {
        tensor.set_grad(grad);
    } else {
        // Initialize with ones for scalar loss
        let ones = ndarray::ArrayD::ones(tensor.data().raw_dim());
        tensor.set_grad(ones);
    }

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
