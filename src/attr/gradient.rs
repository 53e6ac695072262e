//! Gradient plumbing shared by gradient-based attribution methods.
//!
//! - [`apply_gradient_requirements`] turns on gradient tracking for a set of inputs and
//!   returns a [`GradientRequirements`] guard; dropping the guard restores the flags.
//! - [`GradientProvider`] is the capability that evaluates a forward function and
//!   returns the gradient of the selected output with respect to every input.
//!   [`Autograd`] implements it on top of [`Tape`].

use std::ops::Deref;

use tracing::{debug, trace};

use crate::attr::common::ForwardArg;
use crate::attr::target::{select_targets, Target};
use crate::backprop::{Tape, Var};
use crate::error::{AttrError, Result};
use crate::tensors::Ten64;

/// A model evaluated on a [`Tape`].
///
/// `inputs` holds one variable per attributed tensor, in order; `args` holds the
/// additional forward arguments. The returned variable is the model output, with
/// the batch on axis 0.
///
/// Any closure with the matching signature is a `Forward`:
///
/// ```rust
/// use briny_attr::attr::{Forward, ForwardArg};
/// use briny_attr::backprop::{Tape, Var};
/// use briny_attr::error::Result;
///
/// let model = |tape: &Tape, xs: &[Var], _args: &[ForwardArg]| -> Result<Var> {
///     tape.sum_per_example(xs[0])
/// };
/// fn takes_forward(_: &impl Forward) {}
/// takes_forward(&model);
/// ```
pub trait Forward {
    /// Records the forward pass on `tape` and returns the output variable.
    fn forward(&self, tape: &Tape, inputs: &[Var], args: &[ForwardArg]) -> Result<Var>;
}

impl<F> Forward for F
where
    F: Fn(&Tape, &[Var], &[ForwardArg]) -> Result<Var>,
{
    fn forward(&self, tape: &Tape, inputs: &[Var], args: &[ForwardArg]) -> Result<Var> {
        self(tape, inputs, args)
    }
}

/// Scoped gradient tracking over a set of inputs.
///
/// While the guard lives, every input has `requires_grad` set. On drop, the inputs
/// that were switched on by [`apply_gradient_requirements`] are switched back off;
/// inputs that already tracked gradients are left alone. Drop also runs during
/// unwinding, so the flags are restored on every exit path.
#[derive(Debug)]
pub struct GradientRequirements<'a> {
    inputs: &'a mut [Ten64],
    grad_required: Vec<bool>,
}

impl GradientRequirements<'_> {
    /// The flag each input carried before the guard was taken.
    pub fn mask(&self) -> &[bool] {
        &self.grad_required
    }
}

impl Deref for GradientRequirements<'_> {
    type Target = [Ten64];

    fn deref(&self) -> &[Ten64] {
        self.inputs
    }
}

impl Drop for GradientRequirements<'_> {
    fn drop(&mut self) {
        let restore = self.inputs.iter_mut().zip(&self.grad_required);
        for (index, (input, &was_required)) in restore.enumerate() {
            if !was_required {
                trace!(index, "restoring requires_grad = false");
                input.set_requires_grad(false);
            }
        }
    }
}

/// Enables gradient tracking on every input, remembering the previous flags.
pub fn apply_gradient_requirements(inputs: &mut [Ten64]) -> GradientRequirements<'_> {
    let grad_required: Vec<bool> = inputs.iter().map(Ten64::requires_grad).collect();
    for (index, input) in inputs.iter_mut().enumerate() {
        if !input.requires_grad() {
            trace!(index, "input did not require gradients; enabling for this call");
            input.set_requires_grad(true);
        }
    }
    GradientRequirements {
        inputs,
        grad_required,
    }
}

/// Restores the flags captured by [`apply_gradient_requirements`].
///
/// Equivalent to dropping the guard; provided to make the release point explicit.
pub fn undo_gradient_requirements(requirements: GradientRequirements<'_>) {
    drop(requirements);
}

/// Computes `∂(selected output) / ∂(input[i])` for every input.
///
/// Implementations must return exactly one gradient per input, shaped like that input.
pub trait GradientProvider {
    /// Evaluates `forward` on `inputs` (followed by `args`), selects `target` from its
    /// output, and differentiates the selection with respect to each input.
    fn gradients(
        &self,
        forward: &dyn Forward,
        inputs: &[Ten64],
        target: Option<&Target>,
        args: &[ForwardArg],
    ) -> Result<Vec<Ten64>>;
}

impl<G: GradientProvider + ?Sized> GradientProvider for &G {
    fn gradients(
        &self,
        forward: &dyn Forward,
        inputs: &[Ten64],
        target: Option<&Target>,
        args: &[ForwardArg],
    ) -> Result<Vec<Ten64>> {
        (**self).gradients(forward, inputs, target, args)
    }
}

/// Reverse-mode gradients recorded on a fresh [`Tape`] per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Autograd {
    allow_unused: bool,
}

impl Autograd {
    /// Provider that rejects inputs the output does not depend on.
    pub fn new() -> Self {
        Self::default()
    }

    /// When `true`, an input with no path to the output gets an all-zero gradient
    /// instead of [`AttrError::Disconnected`].
    #[must_use]
    pub fn allow_unused(mut self, allow: bool) -> Self {
        self.allow_unused = allow;
        self
    }
}

impl GradientProvider for Autograd {
    fn gradients(
        &self,
        forward: &dyn Forward,
        inputs: &[Ten64],
        target: Option<&Target>,
        args: &[ForwardArg],
    ) -> Result<Vec<Ten64>> {
        if inputs.is_empty() {
            return Err(AttrError::NoInputs);
        }
        if let Some(input) = inputs.iter().position(|t| !t.requires_grad()) {
            return Err(AttrError::NotDifferentiable { input });
        }

        let tape = Tape::new();
        let vars: Vec<Var> = inputs.iter().map(|t| tape.input(t)).collect();
        let output = forward.forward(&tape, &vars, args)?;
        let seed = select_targets(&tape.shape(output)?, target)?;
        let mut grads = tape.backward(output, &seed)?;
        debug!(recorded = tape.len(), "forward and backward pass complete");

        inputs
            .iter()
            .zip(vars)
            .enumerate()
            .map(|(input, (tensor, var))| match grads.take(var) {
                Some(grad) => Ok(grad),
                None if self.allow_unused => Ok(tensor.zeros_like()),
                None => Err(AttrError::Disconnected { input }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor;

    fn dot_first(tape: &Tape, xs: &[Var], _args: &[ForwardArg]) -> Result<Var> {
        let w = tape.constant(tensor!([[2.0], [-1.0]]));
        tape.matmul(xs[0], w)
    }

    #[test]
    fn guard_restores_only_flags_it_changed() {
        let mut xs = vec![
            tensor!([[1.0]]),
            tensor!([[2.0]]).with_requires_grad(true),
        ];
        {
            let guard = apply_gradient_requirements(&mut xs);
            assert_eq!(guard.mask(), &[false, true]);
            assert!(guard.iter().all(Ten64::requires_grad));
        }
        assert!(!xs[0].requires_grad());
        assert!(xs[1].requires_grad());
    }

    #[test]
    fn explicit_undo_restores_flags() {
        let mut xs = vec![tensor!([[1.0]])];
        let guard = apply_gradient_requirements(&mut xs);
        undo_gradient_requirements(guard);
        assert!(!xs[0].requires_grad());
    }

    #[test]
    fn autograd_differentiates_through_matmul() {
        let xs = vec![tensor!([[1.0, 1.0], [3.0, 4.0]]).with_requires_grad(true)];
        let grads = Autograd::new().gradients(&dot_first, &xs, None, &[]).unwrap();
        assert_eq!(grads.len(), 1);
        assert_eq!(grads[0].shape, vec![2, 2]);
        assert_eq!(grads[0].data, vec![2.0, -1.0, 2.0, -1.0]);
    }

    #[test]
    fn autograd_requires_tracked_inputs() {
        let xs = vec![tensor!([[1.0, 1.0]])];
        let err = Autograd::new().gradients(&dot_first, &xs, None, &[]).unwrap_err();
        assert_eq!(err, AttrError::NotDifferentiable { input: 0 });
    }

    #[test]
    fn unused_inputs_error_unless_allowed() {
        let xs = vec![
            tensor!([[1.0, 1.0]]).with_requires_grad(true),
            tensor!([[5.0]]).with_requires_grad(true),
        ];
        let err = Autograd::new().gradients(&dot_first, &xs, None, &[]).unwrap_err();
        assert_eq!(err, AttrError::Disconnected { input: 1 });

        let grads = Autograd::new()
            .allow_unused(true)
            .gradients(&dot_first, &xs, None, &[])
            .unwrap();
        assert_eq!(grads[1].data, vec![0.0]);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let err = Autograd::new().gradients(&dot_first, &[], None, &[]).unwrap_err();
        assert_eq!(err, AttrError::NoInputs);
    }
}
