//! Dynamic-rank tensor with gradient tape support

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ndarray::{Array1, ArrayD, IxDyn};

use super::{BackwardOp, Device};

/// A dynamic-rank f32 tensor with optional gradient tracking.
///
/// The underlying array and the gradient cell are reference-counted, so
/// cloning is cheap and every clone observes the same accumulated gradient.
/// Operations that participate in autograd attach a [`BackwardOp`] to
/// their result via [`Tensor::set_backward_op`].
#[derive(Clone)]
pub struct Tensor {
    data: Rc<ArrayD<f32>>,
    grad: Rc<RefCell<Option<ArrayD<f32>>>>,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
    device: Device,
}

impl Tensor {
    /// Create a CPU tensor from array data.
    pub fn new(data: ArrayD<f32>, requires_grad: bool) -> Self {
        Self::on_device(data, requires_grad, Device::Cpu)
    }

    /// Create a tensor placed on the given device.
    pub fn on_device(data: ArrayD<f32>, requires_grad: bool, device: Device) -> Self {
        Self {
            data: Rc::new(data),
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
            device,
        }
    }

    /// Create a rank-1 CPU tensor from a vector.
    pub fn from_vec(values: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(values).into_dyn(), requires_grad)
    }

    /// Create a rank-0 (scalar) CPU tensor.
    pub fn scalar(value: f32) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(&[]), value), false)
    }

    /// Underlying array data.
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Device this tensor resides on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Strides of the tensor, in elements.
    pub fn strides(&self) -> &[isize] {
        self.data.strides()
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether gradients are tracked for this tensor.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Current accumulated gradient, if any.
    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.grad.borrow().clone()
    }

    /// Shared gradient cell, for backward ops that write the result grad.
    pub fn grad_cell(&self) -> Rc<RefCell<Option<ArrayD<f32>>>> {
        Rc::clone(&self.grad)
    }

    /// Replace the accumulated gradient.
    pub fn set_grad(&self, grad: ArrayD<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Add to the accumulated gradient, initializing it on first write.
    pub fn accumulate_grad(&self, grad: ArrayD<f32>) {
        let mut cell = self.grad.borrow_mut();
        match cell.as_mut() {
            Some(existing) => *existing += &grad,
            None => *cell = Some(grad),
        }
    }

    /// Attach the backward op producing this tensor.
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    /// Backward op producing this tensor, if any.
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }
}

impl PartialEq for Tensor {
    /// Value equality: same data and device. Gradient state is excluded.
    fn eq(&self, other: &Self) -> bool {
        self.device == other.device && self.data == other.data
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("data", &self.data)
            .field("requires_grad", &self.requires_grad)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}
