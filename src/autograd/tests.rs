//! Unit tests for the autograd layer (forward and backward)

use approx::assert_abs_diff_eq;
use ndarray::{ArrayD, IxDyn};

use super::{add, backward, mul, sum, Device, Tensor};

#[test]
fn test_tensor_creation() {
    let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
    assert_eq!(t.len(), 3);
    assert_eq!(t.ndim(), 1);
    assert!(t.requires_grad());
    assert!(t.grad().is_none());
    assert_eq!(t.device(), Device::Cpu);
}

#[test]
fn test_tensor_scalar() {
    let t = Tensor::scalar(2.5);
    assert_eq!(t.ndim(), 0);
    assert_eq!(t.len(), 1);
    assert_abs_diff_eq!(t.data()[IxDyn(&[])], 2.5);
}

#[test]
fn test_tensor_on_device() {
    let t = Tensor::on_device(ArrayD::zeros(IxDyn(&[2, 2])), false, Device::Cuda(1));
    assert_eq!(t.device(), Device::Cuda(1));
    assert_eq!(t.shape(), &[2, 2]);
}

#[test]
fn test_tensor_grad_accumulation() {
    let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);

    t.accumulate_grad(ndarray::arr1(&[1.0, 1.0, 1.0]).into_dyn());
    let grad1 = t.grad().expect("gradient should be available");
    assert_abs_diff_eq!(grad1[[0]], 1.0);

    t.accumulate_grad(ndarray::arr1(&[1.0, 1.0, 1.0]).into_dyn());
    let grad2 = t.grad().expect("gradient should be available");
    assert_abs_diff_eq!(grad2[[0]], 2.0);
}

#[test]
fn test_clone_shares_grad() {
    let t = Tensor::from_vec(vec![1.0, 2.0], true);
    let u = t.clone();
    u.accumulate_grad(ndarray::arr1(&[3.0, 4.0]).into_dyn());
    let grad = t.grad().expect("gradient should be available");
    assert_abs_diff_eq!(grad[[1]], 4.0);
}

#[test]
fn test_add_forward() {
    let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
    let b = Tensor::from_vec(vec![4.0, 5.0, 6.0], true);
    let c = add(&a, &b);

    assert_abs_diff_eq!(c.data()[[0]], 5.0);
    assert_abs_diff_eq!(c.data()[[1]], 7.0);
    assert_abs_diff_eq!(c.data()[[2]], 9.0);
}

#[test]
fn test_add_backward() {
    let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
    let b = Tensor::from_vec(vec![4.0, 5.0, 6.0], true);
    let mut c = add(&a, &b);

    backward(&mut c, Some(ndarray::arr1(&[1.0, 1.0, 1.0]).into_dyn()));

    let grad_a = a.grad().expect("gradient should be available");
    let grad_b = b.grad().expect("gradient should be available");

    assert_abs_diff_eq!(grad_a[[0]], 1.0);
    assert_abs_diff_eq!(grad_b[[0]], 1.0);
}

#[test]
fn test_mul_backward() {
    let a = Tensor::from_vec(vec![2.0, 3.0], true);
    let b = Tensor::from_vec(vec![5.0, 7.0], true);
    let mut c = mul(&a, &b);

    backward(&mut c, Some(ndarray::arr1(&[1.0, 1.0]).into_dyn()));

    let grad_a = a.grad().expect("gradient should be available");
    let grad_b = b.grad().expect("gradient should be available");

    // d(a*b)/da = b
    assert_abs_diff_eq!(grad_a[[0]], 5.0);
    assert_abs_diff_eq!(grad_a[[1]], 7.0);

    // d(a*b)/db = a
    assert_abs_diff_eq!(grad_b[[0]], 2.0);
    assert_abs_diff_eq!(grad_b[[1]], 3.0);
}

#[test]
fn test_sum_forward_and_backward() {
    let a = Tensor::new(
        ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
        true,
    );
    let mut s = sum(&a);

    assert_eq!(s.ndim(), 0);
    assert_abs_diff_eq!(s.data()[IxDyn(&[])], 10.0);

    backward(&mut s, None);

    let grad = a.grad().expect("gradient should be available");
    assert_eq!(grad.shape(), &[2, 2]);
    assert_abs_diff_eq!(grad[[1, 1]], 1.0);
}

#[test]
fn test_backward_chain() {
    // d/da sum((a + b) * b) = b
    let a = Tensor::from_vec(vec![1.0, 2.0], true);
    let b = Tensor::from_vec(vec![3.0, 4.0], false);
    let c = add(&a, &b);
    let d = mul(&c, &b);
    let mut s = sum(&d);

    backward(&mut s, None);

    let grad_a = a.grad().expect("gradient should be available");
    assert_abs_diff_eq!(grad_a[[0]], 3.0);
    assert_abs_diff_eq!(grad_a[[1]], 4.0);
}

#[test]
fn test_device_display() {
    assert_eq!(Device::Cpu.to_string(), "cpu");
    assert_eq!(Device::Cuda(2).to_string(), "cuda:2");
}
