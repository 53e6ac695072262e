//! Error types for attribution and autograd operations.

use thiserror::Error;

/// Result type alias using [`AttrError`].
pub type Result<T> = std::result::Result<T, AttrError>;

/// Errors raised while recording a forward pass, differentiating it, or
/// combining gradients into attributions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AttrError {
    /// Data length does not match the product of the shape.
    #[error("shape {shape:?} is incompatible with {len} data elements")]
    InvalidShape { shape: Vec<usize>, len: usize },

    /// Operands of a binary operation have incompatible shapes.
    #[error("{op}: shape mismatch between {lhs:?} and {rhs:?}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },

    /// An operation received a tensor of the wrong rank.
    #[error("{op}: expected {expected} dimensions, got {got}")]
    DimensionError {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// The output holds several values per example and no target was given.
    #[error("output of shape {shape:?} has several values per example; a target is required")]
    MissingTarget { shape: Vec<usize> },

    /// A target index lies outside the output.
    #[error("target index {index:?} is out of range for output of shape {shape:?}")]
    TargetOutOfRange { index: Vec<usize>, shape: Vec<usize> },

    /// A per-example target list does not cover the batch.
    #[error("per-example target has {got} entries for a batch of {expected}")]
    TargetBatchMismatch { expected: usize, got: usize },

    /// A gradient was requested for a tensor that does not track gradients.
    #[error("input {input} does not require gradients")]
    NotDifferentiable { input: usize },

    /// A variable handle was not recorded on the tape it was used with.
    #[error("variable {index} does not belong to this tape ({len} nodes recorded)")]
    UnknownVar { index: usize, len: usize },

    /// The selected output does not depend on the input.
    #[error("input {input} is not connected to the selected output")]
    Disconnected { input: usize },

    /// Gradients were requested with respect to nothing.
    #[error("gradient computation requires at least one input")]
    NoInputs,

    /// A collection does not hold as many tensors as the inputs it pairs with.
    #[error("expected {expected} {what}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// An additional forward argument has an unexpected kind or is missing.
    #[error("additional forward argument {index}: expected {expected}")]
    InvalidArgument { index: usize, expected: &'static str },

    /// A failure reported by the forward function itself.
    #[error("forward function failed: {0}")]
    Forward(String),
}

impl AttrError {
    /// Wraps a message from a user-supplied forward function.
    pub fn forward(msg: impl Into<String>) -> Self {
        Self::Forward(msg.into())
    }
}
