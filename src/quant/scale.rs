//! Absmax scale computation

use ndarray::{ArrayD, Axis, IxDyn};

use crate::autograd::Tensor;

use super::qtype::QType;

/// Floor keeping scales away from zero so division is always defined.
pub const MIN_SCALE: f32 = 1e-10;

/// Compute a symmetric quantization scale from the maximum absolute value.
///
/// With `axis = None` the result is a rank-0 scalar,
/// `max(|base|) / qtype.max_magnitude()`. With `axis = Some(a)`, `|base|`
/// is max-reduced over every dimension except `a`, keeping reduced
/// dimensions as size 1, so the result has exactly one non-unit dimension
/// and broadcasts against `base`.
///
/// Scales are floored at [`MIN_SCALE`] element-wise. The result lives on
/// `base`'s device and does not track gradients.
///
/// # Panics
///
/// Panics if `axis` is out of bounds for `base`.
pub fn absmax_scale(base: &Tensor, qtype: QType, axis: Option<usize>) -> Tensor {
    let qmax = qtype.max_magnitude();
    let abs = base.data().mapv(f32::abs);

    let scale = match axis {
        None => {
            let absmax = abs.fold(0.0f32, |m, &v| m.max(v));
            ArrayD::from_elem(IxDyn(&[]), (absmax / qmax).max(MIN_SCALE))
        }
        Some(axis) => {
            let mut reduced = abs;
            for dim in (0..base.ndim()).rev() {
                if dim == axis {
                    continue;
                }
                reduced = reduced
                    .map_axis(Axis(dim), |lane| lane.fold(0.0f32, |m, &v| m.max(v)))
                    .insert_axis(Axis(dim));
            }
            reduced.mapv(|m| (m / qmax).max(MIN_SCALE))
        }
    };

    Tensor::on_device(scale, false, base.device())
}
