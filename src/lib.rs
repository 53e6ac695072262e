//! briny_attr: Input × Gradient feature attribution in Rust.
//!
//! Explains the predictions of differentiable models by scoring every input feature
//! with the product of its value and the gradient of the chosen output with respect
//! to it. Gradients come from a small reverse-mode engine in the same crate, or from
//! any other [`attr::GradientProvider`].
//!
//! # Features
//!
//! - Multi-dimensional tensors with a per-tensor differentiability flag.
//! - A reverse-mode tape whose operations return forward values and backward closures.
//! - Input × Gradient attribution that mirrors single-tensor and tuple calling
//!   conventions and always restores the caller's flags.
//!
//! # Modules
//!
//! - [`tensors`] — Core tensor data structures.
//! - [`ops`] — Parallel CPU kernels with their backward closures.
//! - [`backprop`] — The tape recording forward passes and running backward passes.
//! - [`attr`] — Attribution methods and their shared plumbing.
//! - [`error`] — The crate-wide error type.
//! - [`approx`] — Approximate float comparisons.
//!
//! # Example
//!
//! ```rust
//! use briny_attr::attr::{Attributions, ForwardArg, InputXGradient, Target};
//! use briny_attr::backprop::{Tape, Var};
//! use briny_attr::error::Result;
//! use briny_attr::tensor;
//!
//! // a linear classifier with two classes
//! let model = |tape: &Tape, xs: &[Var], _args: &[ForwardArg]| -> Result<Var> {
//!     let w = tape.constant(tensor!([[1.0, -1.0], [2.0, 0.5]]));
//!     tape.matmul(xs[0], w)
//! };
//!
//! let mut x = tensor!([[3.0, 4.0]]);
//! let attr = InputXGradient::new(model)
//!     .attribute(&mut x, Some(Target::Index(0)), None)
//!     .unwrap();
//! assert_eq!(attr, Attributions::Single(tensor!([[3.0, 8.0]])));
//! ```

pub mod approx;
pub mod attr;
pub mod backprop;
pub mod error;
pub mod ops;
pub mod tensors;

pub use error::{AttrError, Result};
