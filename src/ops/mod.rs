//! # Differentiable Kernels
//!
//! This module holds the numeric kernels behind the tape in [`crate::backprop`].
//!
//! ## Submodules
//!
//! - [`cpu`] — Multi-threaded CPU operations built on `rayon`
//!
//! ## Extending
//!
//! To add a new operation:
//!
//! 1. Implement it in [`cpu`], returning the forward value and a backward closure
//! 2. Expose it as a method on [`crate::backprop::Tape`] so it gets recorded
//! 3. Keep shape checks in the kernel so every caller gets the same errors
//!
//! ## Notes
//!
//! - Operations must return both forward values and backward closures
//! - Backward closures own what they capture, so the tape can keep them alive

use crate::tensors::Ten64;

pub mod cpu;

/// Backward closure of a single-operand op: `dL/d(out) -> dL/d(input)`.
pub type UnaryBack = dyn Fn(&Ten64) -> Ten64;

/// Backward closure of a two-operand op: `dL/d(out) -> (dL/d(lhs), dL/d(rhs))`.
pub type BinaryBack = dyn Fn(&Ten64) -> (Ten64, Ten64);
