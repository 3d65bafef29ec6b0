//! Property-based tests for quantization correctness

use ndarray::{ArrayD, IxDyn};
use proptest::prelude::*;

use cuantizar::{
    absmax_scale, backward, quantize, QTensor, QType, QuantAxis, Tensor, QFLOAT16, QINT2, QINT4,
    QINT8, QUINT8,
};

fn int_qtypes() -> impl Strategy<Value = QType> {
    prop_oneof![Just(QINT2), Just(QINT4), Just(QINT8)]
}

fn all_qtypes() -> impl Strategy<Value = QType> {
    prop_oneof![
        Just(QINT2),
        Just(QINT4),
        Just(QINT8),
        Just(QUINT8),
        Just(QFLOAT16),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Round-trip error is bounded by scale/2 element-wise for signed
    /// integer qtypes under the absmax scale.
    #[test]
    fn prop_round_trip_error_bound(
        values in prop::collection::vec(-100.0f32..100.0, 1..32),
        qtype in int_qtypes(),
    ) {
        let base = Tensor::from_vec(values.clone(), false);
        let q = quantize(&base, qtype, None).expect("absmax quantize succeeds");
        let restored = q.dequantize();

        let scale = q.scale()[IxDyn(&[])];
        for (i, &v) in values.iter().enumerate() {
            let err = (restored.data()[[i]] - v).abs();
            prop_assert!(
                err <= 0.5 * scale + 1e-6 * scale.max(1.0),
                "error {} at index {} exceeds scale/2 = {}",
                err, i, 0.5 * scale
            );
        }
    }

    /// Quantized storage dtype always matches the qtype's storage dtype.
    #[test]
    fn prop_storage_dtype_idempotent(
        values in prop::collection::vec(-10.0f32..10.0, 1..32),
        qtype in all_qtypes(),
    ) {
        let base = Tensor::from_vec(values, false);
        let q = quantize(&base, qtype, None).expect("absmax quantize succeeds");
        prop_assert_eq!(q.data().dtype(), qtype.dtype());
        prop_assert_eq!(q.shape(), base.shape());
    }

    /// Quantized integer values never leave the representable range,
    /// whatever the supplied scale.
    #[test]
    fn prop_clamping_never_overflows(
        values in prop::collection::vec(-1000.0f32..1000.0, 1..32),
        scale in 0.001f32..10.0,
        qtype in int_qtypes(),
    ) {
        let base = Tensor::from_vec(values, false);
        let scale = Tensor::scalar(scale);
        let q = quantize(&base, qtype, Some(&scale)).expect("scalar scale is valid");

        let info = qtype.info();
        for v in q.data().to_f32().iter() {
            prop_assert!(*v >= info.min && *v <= info.max,
                "quantized value {} outside [{}, {}]", v, info.min, info.max);
        }
    }

    /// Gradient of a quantize→dequantize round trip is the identity:
    /// the upstream gradient reaches the base unchanged.
    #[test]
    fn prop_gradient_identity(
        pairs in prop::collection::vec((-50.0f32..50.0, -5.0f32..5.0), 1..32),
        qtype in int_qtypes(),
    ) {
        let (values, upstream): (Vec<f32>, Vec<f32>) = pairs.into_iter().unzip();

        let base = Tensor::from_vec(values, true);
        let q = quantize(&base, qtype, None).expect("absmax quantize succeeds");
        let mut restored = q.dequantize();

        let upstream = ndarray::Array1::from(upstream).into_dyn();
        backward(&mut restored, Some(upstream.clone()));

        let grad = base.grad().expect("gradient should reach the base");
        prop_assert_eq!(grad, upstream);
    }

    /// An all-unit scale shape collapses to a scalar with no axis; a
    /// single non-unit dimension resolves to that axis, with the last
    /// dimension normalized to the sentinel.
    #[test]
    fn prop_axis_resolution(
        rows in 1usize..5,
        cols in 2usize..6,
        axis in 0usize..2,
    ) {
        let base = Tensor::new(
            ArrayD::from_elem(IxDyn(&[rows, cols]), 1.0),
            false,
        );
        let scale = absmax_scale(&base, QINT8, Some(axis));
        let q = quantize(&base, QINT8, Some(&scale)).expect("per-axis scale is valid");

        let dim = scale.shape()[axis];
        if dim == 1 {
            // Degenerate per-axis scale: every dim is 1, scalar collapse
            prop_assert_eq!(q.axis(), None);
            prop_assert_eq!(q.scale().ndim(), 0);
        } else if axis == 1 {
            prop_assert_eq!(q.axis(), Some(QuantAxis::Last));
        } else {
            prop_assert_eq!(q.axis(), Some(QuantAxis::Dim(axis)));
        }
    }

    /// Per-axis quantization round-trips within the per-slice bound.
    #[test]
    fn prop_per_axis_round_trip(
        rows in 1usize..4,
        cols in 1usize..4,
        seed in prop::collection::vec(-100.0f32..100.0, 16),
    ) {
        let values: Vec<f32> = seed.into_iter().take(rows * cols).collect();
        prop_assume!(values.len() == rows * cols);

        let base = Tensor::new(
            ArrayD::from_shape_vec(IxDyn(&[rows, cols]), values.clone()).unwrap(),
            false,
        );
        let scale = absmax_scale(&base, QINT8, Some(0));
        let q = quantize(&base, QINT8, Some(&scale)).expect("per-axis scale is valid");
        let restored = q.dequantize();

        for r in 0..rows {
            let row_scale = scale.data()[[r, 0]];
            for c in 0..cols {
                let err = (restored.data()[[r, c]] - base.data()[[r, c]]).abs();
                prop_assert!(
                    err <= 0.5 * row_scale + 1e-6 * row_scale.max(1.0),
                    "row {} err {} exceeds scale/2 = {}", r, err, 0.5 * row_scale
                );
            }
        }
    }

    /// Flatten → unflatten reproduces the same data, scale, and qtype.
    #[test]
    fn prop_flatten_round_trip(
        values in prop::collection::vec(-10.0f32..10.0, 1..32),
        qtype in all_qtypes(),
    ) {
        let base = Tensor::from_vec(values, false);
        let q = quantize(&base, qtype, None).expect("absmax quantize succeeds");

        let (inner, meta) = q.flatten();
        prop_assert_eq!(inner.len(), 2);
        prop_assert_eq!(meta.len(), 1);

        let restored = QTensor::unflatten(&inner, &meta, q.shape())
            .expect("flatten output is well-formed");
        prop_assert_eq!(restored, q);
    }
}
