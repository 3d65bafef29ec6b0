//! Quantized tensor entity: storage, axis resolution, reconstruction

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use half::f16;
use ndarray::{ArrayD, Axis};
use serde::{Deserialize, Serialize};

use crate::autograd::{BackwardOp, Device, Tensor};

use super::error::{QuantError, Result};
use super::qtype::{DType, QType};

/// Quantized element storage in the target dtype.
#[derive(Clone, Debug, PartialEq)]
pub enum QValues {
    I8(ArrayD<i8>),
    U8(ArrayD<u8>),
    F16(ArrayD<f16>),
}

/// Quantized data: element storage plus the device it resides on.
#[derive(Clone, Debug, PartialEq)]
pub struct QData {
    values: QValues,
    device: Device,
}

impl QData {
    /// Wrap signed 8-bit storage.
    pub fn i8(values: ArrayD<i8>, device: Device) -> Self {
        Self {
            values: QValues::I8(values),
            device,
        }
    }

    /// Wrap unsigned 8-bit storage.
    pub fn u8(values: ArrayD<u8>, device: Device) -> Self {
        Self {
            values: QValues::U8(values),
            device,
        }
    }

    /// Wrap half-precision storage.
    pub fn f16(values: ArrayD<f16>, device: Device) -> Self {
        Self {
            values: QValues::F16(values),
            device,
        }
    }

    /// Cast already-rounded, already-clamped f32 values into storage.
    pub fn from_f32(data: &ArrayD<f32>, dtype: DType, device: Device) -> Self {
        let values = match dtype {
            DType::I8 => QValues::I8(data.mapv(|v| v as i8)),
            DType::U8 => QValues::U8(data.mapv(|v| v as u8)),
            DType::F16 => QValues::F16(data.mapv(f16::from_f32)),
        };
        Self { values, device }
    }

    /// Storage element type.
    pub fn dtype(&self) -> DType {
        match &self.values {
            QValues::I8(_) => DType::I8,
            QValues::U8(_) => DType::U8,
            QValues::F16(_) => DType::F16,
        }
    }

    /// Device the data resides on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Shape of the stored array.
    pub fn shape(&self) -> &[usize] {
        match &self.values {
            QValues::I8(a) => a.shape(),
            QValues::U8(a) => a.shape(),
            QValues::F16(a) => a.shape(),
        }
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Whether the data has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw storage values.
    pub fn values(&self) -> &QValues {
        &self.values
    }

    /// Upcast the stored elements to f32.
    pub fn to_f32(&self) -> ArrayD<f32> {
        match &self.values {
            QValues::I8(a) => a.mapv(f32::from),
            QValues::U8(a) => a.mapv(f32::from),
            QValues::F16(a) => a.mapv(f16::to_f32),
        }
    }
}

impl fmt::Display for QData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.values {
            QValues::I8(a) => write!(f, "{a}"),
            QValues::U8(a) => write!(f, "{a}"),
            QValues::F16(a) => write!(f, "{a}"),
        }
    }
}

/// Resolved quantization axis of a per-axis scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantAxis {
    /// A specific dimension index.
    Dim(usize),
    /// The last dimension; index `rank - 1` is normalized to this so
    /// downstream broadcasting code can be axis-agnostic.
    Last,
}

impl QuantAxis {
    /// Concrete dimension index for a tensor of the given rank.
    pub fn resolve(&self, ndim: usize) -> usize {
        match self {
            QuantAxis::Dim(d) => *d,
            QuantAxis::Last => ndim - 1,
        }
    }
}

/// One inner tensor of a flattened [`QTensor`].
#[derive(Clone, Debug, PartialEq)]
pub enum QTensorPart {
    /// The quantized data member (`"data"`).
    Data(QData),
    /// The scale member (`"scale"`).
    Scale(Tensor),
}

/// A tensor quantized to a low-precision format plus a scale.
///
/// Bundles the quantized data, the scale relating it back to the original
/// magnitude, and the [`QType`] tag. The quantization axis is resolved
/// eagerly at construction and exposed read-only; the (external) operation
/// registry consumes it to pick specialized quantized kernels.
#[derive(Clone)]
pub struct QTensor {
    qtype: QType,
    axis: Option<QuantAxis>,
    data: QData,
    scale: ArrayD<f32>,
    device: Device,
    requires_grad: bool,
    grad: Rc<RefCell<Option<ArrayD<f32>>>>,
    backward_op: Option<Rc<dyn BackwardOp>>,
}

impl QTensor {
    /// Construct from pre-quantized data and a scale.
    ///
    /// Validates eagerly: data and scale must share a device
    /// ([`QuantError::DeviceMismatch`]); a non-scalar scale must have at
    /// most one non-unit dimension ([`QuantError::MultiAxisUnsupported`])
    /// and the same rank as the data ([`QuantError::NotBroadcastable`]).
    /// An all-unit scale collapses to a rank-0 scalar with no axis; an
    /// axis at `rank - 1` is normalized to [`QuantAxis::Last`].
    pub fn new(qtype: QType, data: QData, scale: Tensor) -> Result<Self> {
        if data.device() != scale.device() {
            return Err(QuantError::DeviceMismatch {
                data: data.device(),
                scale: scale.device(),
            });
        }

        let mut scale_data = scale.data().clone();
        let mut axis = None;

        if scale_data.ndim() > 0 {
            // Count non-unit dims on the original shape, not post-squeeze
            let non_unit: Vec<usize> = scale_data
                .shape()
                .iter()
                .enumerate()
                .filter(|&(_, &d)| d != 1)
                .map(|(i, _)| i)
                .collect();
            if non_unit.len() > 1 {
                return Err(QuantError::MultiAxisUnsupported(
                    scale_data.shape().to_vec(),
                ));
            }
            if scale_data.ndim() != data.ndim() {
                return Err(QuantError::NotBroadcastable {
                    scale_ndim: scale_data.ndim(),
                    data_ndim: data.ndim(),
                });
            }
            match non_unit.first() {
                None => {
                    // All dims are 1: the scale is actually a scalar
                    while scale_data.ndim() > 0 {
                        scale_data = scale_data.remove_axis(Axis(0));
                    }
                }
                Some(&dim) if dim == scale_data.ndim() - 1 => {
                    axis = Some(QuantAxis::Last);
                }
                Some(&dim) => {
                    axis = Some(QuantAxis::Dim(dim));
                }
            }
        }

        let device = data.device();
        Ok(Self {
            qtype,
            axis,
            data,
            scale: scale_data,
            device,
            requires_grad: false,
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
        })
    }

    /// Quantize a tensor; see [`quantize`](crate::quant::quantize).
    pub fn quantize(base: &Tensor, qtype: QType, scale: Option<&Tensor>) -> Result<Self> {
        super::quantize::quantize(base, qtype, scale)
    }

    /// The quantized format tag.
    pub fn qtype(&self) -> QType {
        self.qtype
    }

    /// The resolved quantization axis, or `None` for a scalar scale.
    pub fn axis(&self) -> Option<QuantAxis> {
        self.axis
    }

    /// The quantized data, in storage dtype.
    pub fn data(&self) -> &QData {
        &self.data
    }

    /// The scale tensor (rank 0, or one non-unit dimension).
    pub fn scale(&self) -> &ArrayD<f32> {
        &self.scale
    }

    /// Device the value resides on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Shape of the quantized data.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Number of dimensions of the quantized data.
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Whether gradients are tracked through this value.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub(crate) fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }

    /// Current accumulated gradient, if any.
    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.grad.borrow().clone()
    }

    /// Shared gradient cell, for backward ops writing the result grad.
    pub fn grad_cell(&self) -> Rc<RefCell<Option<ArrayD<f32>>>> {
        Rc::clone(&self.grad)
    }

    /// Add to the accumulated gradient, initializing it on first write.
    pub fn accumulate_grad(&self, grad: ArrayD<f32>) {
        let mut cell = self.grad.borrow_mut();
        match cell.as_mut() {
            Some(existing) => *existing += &grad,
            None => *cell = Some(grad),
        }
    }

    pub(crate) fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    /// Backward op producing this value, if any.
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Split into named inner tensors plus metadata.
    ///
    /// The inner map holds exactly two entries, `"data"` and `"scale"`;
    /// the metadata map holds exactly one entry, `"qtype"`. Generic
    /// tree-mapping utilities rely on this exact shape, and
    /// [`QTensor::unflatten`] is its pure inverse.
    pub fn flatten(&self) -> (BTreeMap<String, QTensorPart>, BTreeMap<String, String>) {
        let mut inner = BTreeMap::new();
        inner.insert("data".to_string(), QTensorPart::Data(self.data.clone()));
        inner.insert(
            "scale".to_string(),
            QTensorPart::Scale(Tensor::on_device(self.scale.clone(), false, self.device)),
        );

        let mut meta = BTreeMap::new();
        meta.insert("qtype".to_string(), self.qtype.name().to_string());

        (inner, meta)
    }

    /// Reconstruct a quantized tensor from its flattened representation.
    ///
    /// Rejects with [`QuantError::MalformedFlatRepresentation`] unless the
    /// inner map holds exactly the `"data"` and `"scale"` tensors, the
    /// metadata holds exactly one `"qtype"` entry naming a known format,
    /// and the data matches `outer_shape`.
    pub fn unflatten(
        inner: &BTreeMap<String, QTensorPart>,
        meta: &BTreeMap<String, String>,
        outer_shape: &[usize],
    ) -> Result<Self> {
        if inner.len() != 2 {
            return Err(QuantError::MalformedFlatRepresentation(format!(
                "expected exactly 2 inner tensors, got {}",
                inner.len()
            )));
        }
        if meta.len() != 1 {
            return Err(QuantError::MalformedFlatRepresentation(format!(
                "expected exactly 1 metadata entry, got {}",
                meta.len()
            )));
        }

        let data = match inner.get("data") {
            Some(QTensorPart::Data(data)) => data.clone(),
            _ => {
                return Err(QuantError::MalformedFlatRepresentation(
                    "missing \"data\" inner tensor".to_string(),
                ))
            }
        };
        let scale = match inner.get("scale") {
            Some(QTensorPart::Scale(scale)) => scale.clone(),
            _ => {
                return Err(QuantError::MalformedFlatRepresentation(
                    "missing \"scale\" inner tensor".to_string(),
                ))
            }
        };
        let qtype = meta
            .get("qtype")
            .and_then(|name| QType::by_name(name))
            .ok_or_else(|| {
                QuantError::MalformedFlatRepresentation(
                    "missing or unknown \"qtype\" metadata entry".to_string(),
                )
            })?;

        if data.shape() != outer_shape {
            return Err(QuantError::MalformedFlatRepresentation(format!(
                "data shape {:?} does not match outer shape {:?}",
                data.shape(),
                outer_shape
            )));
        }

        Self::new(qtype, data, scale)
    }
}

impl PartialEq for QTensor {
    fn eq(&self, other: &Self) -> bool {
        self.qtype == other.qtype
            && self.axis == other.axis
            && self.data == other.data
            && self.scale == other.scale
            && self.device == other.device
    }
}

impl fmt::Display for QTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let autograd_info = if self.backward_op.is_some() {
            ", grad_fn=<backward>"
        } else if self.requires_grad {
            ", requires_grad=true"
        } else {
            ""
        };
        write!(
            f,
            "QTensor({}, scale={}, public_dtype=f32{autograd_info})",
            self.data, self.scale
        )
    }
}

impl fmt::Debug for QTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QTensor")
            .field("qtype", &self.qtype)
            .field("axis", &self.axis)
            .field("data", &self.data)
            .field("scale", &self.scale)
            .field("device", &self.device)
            .field("requires_grad", &self.requires_grad)
            .finish_non_exhaustive()
    }
}
