//! Feature attribution.
//!
//! # Attribution Methods
//!
//! An attribution method explains a model's prediction by assigning a score to every
//! input feature. This module provides Input × Gradient together with the pieces it is
//! assembled from, so other gradient-based methods can reuse them:
//!
//! - [`common`] — single-vs-tuple input normalization and forward-argument values
//! - [`target`] — selection of the output scalar to explain
//! - [`gradient`] — scoped gradient tracking and the [`GradientProvider`] capability
//! - [`input_x_gradient`] — the [`InputXGradient`] method
//!
//! ## Pipeline
//!
//! normalize inputs → enable gradients → compute gradients → multiply → restore
//! flags → restore the caller's input form.

pub mod common;
pub mod gradient;
pub mod input_x_gradient;
pub mod target;

pub use common::{Attributions, ForwardArg, Inputs};
pub use gradient::{Autograd, Forward, GradientProvider, GradientRequirements};
pub use input_x_gradient::InputXGradient;
pub use target::Target;
