//! Parallel CPU tensor kernels
//!
//! # CPU Backend
//!
//! Every differentiable kernel computes its forward value eagerly and returns a boxed
//! closure mapping the upstream gradient `dL/d(out)` to the gradient(s) of its operands.
//! The tape in [`crate::backprop`] stores these closures and replays them in reverse.
//!
//! ## Features
//!
//! - Parallel execution using [`rayon`](https://docs.rs/rayon)
//! - Shape checks up front, returning [`AttrError`] instead of panicking
//!
//! ## Implemented Ops
//!
//! - `add`, `sub`, `mul`: elementwise binary ops on equal shapes
//! - `scale`, `add_scalar`, `square`: elementwise unary ops
//! - `relu`, `sigmoid`, `tanh`: activations
//! - `matmul`: 2-D matrix multiplication
//! - `sum_per_example`, `sum`: reductions
//! - `hadamard`: plain elementwise product without a backward pass
//!
//! ## Design Goals
//!
//! - Deterministic results (given deterministic input and scheduling)
//! - Closures capture only the data their backward pass needs

use rayon::prelude::*;

use crate::error::{AttrError, Result};
use crate::ops::{BinaryBack, UnaryBack};
use crate::tensors::{Ten64, Tensor};

fn check_same_shape(op: &'static str, a: &Ten64, b: &Ten64) -> Result<()> {
    if a.shape != b.shape {
        return Err(AttrError::ShapeMismatch {
            op,
            lhs: a.shape.clone(),
            rhs: b.shape.clone(),
        });
    }
    Ok(())
}

fn zip_map(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64 + Sync + Send) -> Vec<f64> {
    a.par_iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

fn map(a: &[f64], f: impl Fn(f64) -> f64 + Sync + Send) -> Vec<f64> {
    a.par_iter().map(|&x| f(x)).collect()
}

/// Elementwise product of two equally shaped tensors.
///
/// The result does not track gradients.
pub fn hadamard(a: &Ten64, b: &Ten64) -> Result<Ten64> {
    check_same_shape("hadamard", a, b)?;
    Ok(Tensor::new(a.shape.clone(), zip_map(&a.data, &b.data, |x, y| x * y)))
}

/// Elementwise `a + b`.
pub fn add(a: &Ten64, b: &Ten64) -> Result<(Ten64, Box<BinaryBack>)> {
    check_same_shape("add", a, b)?;
    let out = Tensor::new(a.shape.clone(), zip_map(&a.data, &b.data, |x, y| x + y));

    let back = move |grad: &Ten64| (grad.detach(), grad.detach());
    Ok((out, Box::new(back)))
}

/// Elementwise `a - b`.
pub fn sub(a: &Ten64, b: &Ten64) -> Result<(Ten64, Box<BinaryBack>)> {
    check_same_shape("sub", a, b)?;
    let out = Tensor::new(a.shape.clone(), zip_map(&a.data, &b.data, |x, y| x - y));

    let back = move |grad: &Ten64| {
        let neg = Tensor::new(grad.shape.clone(), map(&grad.data, |g| -g));
        (grad.detach(), neg)
    };
    Ok((out, Box::new(back)))
}

/// Elementwise `a * b`.
///
/// # Returns
/// - Product tensor
/// - Closure mapping `dL/d(out)` to `(dL/d(out) * b, dL/d(out) * a)`
pub fn mul(a: &Ten64, b: &Ten64) -> Result<(Ten64, Box<BinaryBack>)> {
    check_same_shape("mul", a, b)?;
    let out = Tensor::new(a.shape.clone(), zip_map(&a.data, &b.data, |x, y| x * y));

    let a_val = a.detach();
    let b_val = b.detach();
    let back = move |grad: &Ten64| {
        let ga = Tensor::new(grad.shape.clone(), zip_map(&grad.data, &b_val.data, |g, y| g * y));
        let gb = Tensor::new(grad.shape.clone(), zip_map(&grad.data, &a_val.data, |g, x| g * x));
        (ga, gb)
    };
    Ok((out, Box::new(back)))
}

/// `k * a` for a constant `k`.
pub fn scale(a: &Ten64, k: f64) -> (Ten64, Box<UnaryBack>) {
    let out = Tensor::new(a.shape.clone(), map(&a.data, |x| k * x));
    let back = move |grad: &Ten64| Tensor::new(grad.shape.clone(), map(&grad.data, |g| k * g));
    (out, Box::new(back))
}

/// `a + k` for a constant `k`.
pub fn add_scalar(a: &Ten64, k: f64) -> (Ten64, Box<UnaryBack>) {
    let out = Tensor::new(a.shape.clone(), map(&a.data, |x| x + k));
    let back = move |grad: &Ten64| grad.detach();
    (out, Box::new(back))
}

/// Elementwise `a²`.
pub fn square(a: &Ten64) -> (Ten64, Box<UnaryBack>) {
    let out = Tensor::new(a.shape.clone(), map(&a.data, |x| x * x));
    let input = a.data.clone();
    let back = move |grad: &Ten64| {
        Tensor::new(grad.shape.clone(), zip_map(&grad.data, &input, |g, x| 2.0 * x * g))
    };
    (out, Box::new(back))
}

/// Applies the ReLU activation function element-wise: `max(0, x)`.
///
/// The backward closure passes gradients only where the input was positive.
pub fn relu(a: &Ten64) -> (Ten64, Box<UnaryBack>) {
    let out = Tensor::new(a.shape.clone(), map(&a.data, |x| if x > 0.0 { x } else { 0.0 }));
    let input = a.data.clone();
    let back = move |grad: &Ten64| {
        Tensor::new(
            grad.shape.clone(),
            zip_map(&grad.data, &input, |g, x| if x > 0.0 { g } else { 0.0 }),
        )
    };
    (out, Box::new(back))
}

/// Logistic sigmoid `1 / (1 + e^-x)`.
pub fn sigmoid(a: &Ten64) -> (Ten64, Box<UnaryBack>) {
    let out = Tensor::new(a.shape.clone(), map(&a.data, |x| 1.0 / (1.0 + (-x).exp())));
    let y = out.data.clone();
    let back = move |grad: &Ten64| {
        Tensor::new(grad.shape.clone(), zip_map(&grad.data, &y, |g, s| g * s * (1.0 - s)))
    };
    (out, Box::new(back))
}

/// Hyperbolic tangent.
pub fn tanh(a: &Ten64) -> (Ten64, Box<UnaryBack>) {
    let out = Tensor::new(a.shape.clone(), map(&a.data, f64::tanh));
    let y = out.data.clone();
    let back = move |grad: &Ten64| {
        Tensor::new(grad.shape.clone(), zip_map(&grad.data, &y, |g, t| g * (1.0 - t * t)))
    };
    (out, Box::new(back))
}

fn matmul_raw(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut out = vec![0.0; m * n];
    if n == 0 {
        return out;
    }
    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for (j, cell) in row.iter_mut().enumerate() {
            let mut sum = 0.0;
            for l in 0..k {
                sum += a[i * k + l] * b[l * n + j];
            }
            *cell = sum;
        }
    });
    out
}

fn transpose(data: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut out = vec![0.0; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = data[r * cols + c];
        }
    }
    out
}

/// Performs a matrix multiplication `C = A × B` on two 2D tensors (`A: m×k`, `B: k×n`).
///
/// # Returns
/// - Output tensor of shape `[m, n]`
/// - Backward function computing `(dL/dA, dL/dB) = (G·Bᵀ, Aᵀ·G)`
pub fn matmul(a: &Ten64, b: &Ten64) -> Result<(Ten64, Box<BinaryBack>)> {
    for t in [a, b] {
        if t.ndim() != 2 {
            return Err(AttrError::DimensionError {
                op: "matmul",
                expected: 2,
                got: t.ndim(),
            });
        }
    }
    let (m, k, n) = (a.shape[0], a.shape[1], b.shape[1]);
    if k != b.shape[0] {
        return Err(AttrError::ShapeMismatch {
            op: "matmul",
            lhs: a.shape.clone(),
            rhs: b.shape.clone(),
        });
    }

    let out = Tensor::new(vec![m, n], matmul_raw(&a.data, &b.data, m, k, n));

    let a_t = transpose(&a.data, m, k);
    let b_t = transpose(&b.data, k, n);
    let back = move |grad: &Ten64| {
        let ga = matmul_raw(&grad.data, &b_t, m, n, k);
        let gb = matmul_raw(&a_t, &grad.data, k, m, n);
        (Tensor::new(vec![m, k], ga), Tensor::new(vec![k, n], gb))
    };
    Ok((out, Box::new(back)))
}

/// Sums every non-batch axis, producing one value per example (shape `[N]`).
pub fn sum_per_example(a: &Ten64) -> Result<(Ten64, Box<UnaryBack>)> {
    if a.ndim() == 0 {
        return Err(AttrError::DimensionError {
            op: "sum_per_example",
            expected: 1,
            got: 0,
        });
    }
    let batch = a.shape[0];
    let width = if batch == 0 { 0 } else { a.numel() / batch };
    let sums: Vec<f64> = if width == 0 {
        vec![0.0; batch]
    } else {
        a.data.par_chunks(width).map(|row| row.iter().sum()).collect()
    };
    let out = Tensor::new(vec![batch], sums);

    let shape = a.shape.clone();
    let back = move |grad: &Ten64| {
        let mut data = Vec::with_capacity(batch * width);
        for &g in &grad.data {
            data.extend(std::iter::repeat_n(g, width));
        }
        Tensor::new(shape.clone(), data)
    };
    Ok((out, Box::new(back)))
}

/// Sums every element into a 0-d scalar.
pub fn sum(a: &Ten64) -> (Ten64, Box<UnaryBack>) {
    let total: f64 = a.data.par_iter().sum();
    let out = Tensor::new(Vec::<usize>::new(), vec![total]);

    let shape = a.shape.clone();
    let back = move |grad: &Ten64| Tensor::full(shape.clone(), grad.data[0]);
    (out, Box::new(back))
}
