//! Core tensor data structures.
//!
//! # Core Tensor Utilities
//!
//! This module defines how multi-dimensional arrays are represented throughout the crate.
//!
//! It supports:
//! - Construction of N-dimensional tensors with shape and row-major data layout
//! - A per-tensor differentiability flag (`requires_grad`)
//! - Compile-time tensor literals through the `tensor!` macro
//!
//! ## Design Highlights
//! - Tensors are strongly typed: `Tensor<T>` for any element type (the engine uses `f64`)
//! - Shape is stored as a `Vec<usize>` and enforced at runtime
//! - Dimension 0 is the batch axis for every tensor handed to an attribution method
//! - The differentiability flag is plain data: whoever holds `&mut Tensor` may flip it
//!
//! ## Limitations
//! - Row-major only
//! - No broadcasting, slicing, or shape inference
//!
//! ## Example
//!
//! ```rust
//! use briny_attr::tensors::Tensor;
//! let t = Tensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(t.shape, vec![2, 3]);
//! assert!(!t.requires_grad());
//! ```

use crate::error::{AttrError, Result};

/// Represents an N-dimensional tensor with a shape and flat row-major data.
///
/// - All elements must be the same type (`T`).
/// - `shape` defines the structure, e.g., `[2, 3]` for a 2×3 matrix.
/// - `data` holds the flattened content in row-major order.
/// - `requires_grad` records whether gradients should be tracked for this tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
    pub requires_grad: bool,
}

/// The tensor type every differentiable operation works on.
pub type Ten64 = Tensor<f64>;

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and flat data.
    ///
    /// Gradient tracking starts disabled.
    ///
    /// # Panics
    /// Panics if the number of elements in `data` does not match the shape product.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Self {
        let shape = shape.into();
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {:?} is incompatible with {} data elements",
            shape,
            data.len()
        );
        Self {
            shape,
            data,
            requires_grad: false,
        }
    }

    /// Fallible counterpart of [`Tensor::new`].
    pub fn try_new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Result<Self> {
        let shape = shape.into();
        let expected = shape.iter().product::<usize>();
        if expected != data.len() {
            return Err(AttrError::InvalidShape {
                shape,
                len: data.len(),
            });
        }
        Ok(Self {
            shape,
            data,
            requires_grad: false,
        })
    }

    /// Returns the tensor with its differentiability flag set to `flag`.
    #[must_use]
    pub fn with_requires_grad(mut self, flag: bool) -> Self {
        self.requires_grad = flag;
        self
    }

    /// Whether gradients are tracked for this tensor.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Overwrites the differentiability flag.
    pub fn set_requires_grad(&mut self, flag: bool) {
        self.requires_grad = flag;
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Size of the batch axis (dimension 0). A 0-d tensor counts as a batch of one.
    pub fn batch_size(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Replaces this tensor's data with another tensor of the same shape.
    ///
    /// The differentiability flag of `self` is left as it was.
    ///
    /// # Panics
    /// Panics if shapes do not match.
    pub fn update(&mut self, mut other: Tensor<T>) {
        assert_eq!(self.shape, other.shape, "shape mismatch");
        std::mem::swap(&mut self.data, &mut other.data);
    }
}

impl<T: Clone> Tensor<T> {
    /// A tensor of `shape` with every element equal to `value`.
    pub fn full(shape: impl Into<Vec<usize>>, value: T) -> Self {
        let shape = shape.into();
        let n = shape.iter().product();
        Self::new(shape, vec![value; n])
    }
}

impl Ten64 {
    /// A zero-filled tensor.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        Self::full(shape, 0.0)
    }

    /// A one-filled tensor.
    pub fn ones(shape: impl Into<Vec<usize>>) -> Self {
        Self::full(shape, 1.0)
    }

    /// A zero-filled tensor with the shape of `self`, not tracking gradients.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape.clone())
    }

    /// Copies the data and shape while dropping the differentiability flag.
    pub fn detach(&self) -> Self {
        Self::new(self.shape.clone(), self.data.clone())
    }
}

/// Defines a tensor from nested literal arrays.
///
/// Supports arbitrary dimensionality as long as sublists are uniform in shape.
///
/// # Example
/// ```
/// use briny_attr::tensor;
/// let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(t.shape, vec![2, 2]);
///
/// let w = tensor!([[1.0, -2.0], [-0.5, 3.0]]);
/// assert_eq!(w.data, vec![1.0, -2.0, -0.5, 3.0]);
/// ```
#[macro_export]
macro_rules! tensor {
    (@rows [$($done:expr),*]) => {
        vec![$($done),*]
    };

    // a negative element is two tokens, `-` and the literal
    (@rows [$($done:expr),*] - $lit:literal $(, $($rest:tt)*)?) => {
        $crate::tensor!(@rows [$($done,)* $crate::tensor!(- $lit)] $($($rest)*)?)
    };

    (@rows [$($done:expr),*] $head:tt $(, $($rest:tt)*)?) => {
        $crate::tensor!(@rows [$($done,)* $crate::tensor!($head)] $($($rest)*)?)
    };

    (- $lit:literal) => {
        $crate::tensors::Tensor::new(Vec::<usize>::new(), vec![-$lit])
    };

    ($lit:literal) => {
        $crate::tensors::Tensor::new(Vec::<usize>::new(), vec![$lit])
    };

    ([ $($body:tt)+ ]) => {{
        let children: Vec<$crate::tensors::Tensor<_>> = $crate::tensor!(@rows [] $($body)+);
        let first_shape = &children[0].shape;
        assert!(children.iter().all(|c| c.shape == *first_shape),
            "ragged tensor literal (rows have mismatched shapes)");
        let mut shape = vec![children.len()];
        shape.extend_from_slice(first_shape);
        let mut data = Vec::with_capacity(children.len() * children[0].data.len());
        for c in children { data.extend(c.data); }
        $crate::tensors::Tensor::new(shape, data)
    }};
}
