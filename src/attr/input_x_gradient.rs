//! Input × Gradient attribution.

use tracing::debug;

use crate::attr::common::{
    format_additional_forward_args, format_attributions, format_input, Attributions, ForwardArg,
    Inputs,
};
use crate::attr::gradient::{apply_gradient_requirements, Autograd, Forward, GradientProvider};
use crate::attr::target::Target;
use crate::error::{AttrError, Result};
use crate::ops::cpu;

/// Attributes a prediction to input features by multiplying each input with the
/// gradient of the selected output with respect to it.
///
/// Reference: Shrikumar et al., "Not Just a Black Box: Learning Important Features
/// Through Propagating Activation Differences", 2016 (<https://arxiv.org/abs/1611.07270>).
///
/// # Example
///
/// ```rust
/// use briny_attr::attr::{Attributions, ForwardArg, InputXGradient};
/// use briny_attr::backprop::{Tape, Var};
/// use briny_attr::error::Result;
/// use briny_attr::tensor;
///
/// let model = |tape: &Tape, xs: &[Var], _args: &[ForwardArg]| -> Result<Var> {
///     tape.sum_per_example(xs[0])
/// };
/// let mut x = tensor!([[1.0, 2.0, 3.0]]);
/// let attributions = InputXGradient::new(model).attribute(&mut x, None, None).unwrap();
/// assert_eq!(attributions, Attributions::Single(tensor!([[1.0, 2.0, 3.0]])));
/// assert!(!x.requires_grad());
/// ```
pub struct InputXGradient<F, G = Autograd> {
    forward: F,
    gradient_provider: G,
}

impl<F: Forward> InputXGradient<F> {
    /// Explains `forward` using reverse-mode gradients from [`Autograd`].
    pub fn new(forward: F) -> Self {
        Self::with_gradient_provider(forward, Autograd::default())
    }
}

impl<F: Forward, G: GradientProvider> InputXGradient<F, G> {
    /// Explains `forward` using gradients from `gradient_provider`.
    pub fn with_gradient_provider(forward: F, gradient_provider: G) -> Self {
        Self {
            forward,
            gradient_provider,
        }
    }

    /// The model being explained.
    pub fn forward_func(&self) -> &F {
        &self.forward
    }

    /// The capability used to compute gradients.
    pub fn gradient_provider(&self) -> &G {
        &self.gradient_provider
    }

    /// Computes `input ⊙ ∂output/∂input` for every input.
    ///
    /// `inputs` is a single tensor or a tuple of tensors whose axis 0 is the batch;
    /// the result has the same form, count and shapes. `target` selects the output
    /// scalar per example and may be `None` when the model already returns one value
    /// per example. `additional_forward_args` are passed to the model after the inputs
    /// and are not attributed.
    ///
    /// The inputs' `requires_grad` flags are switched on for the gradient computation
    /// and restored before returning, whether the call succeeds or fails.
    ///
    /// # Errors
    ///
    /// Failures from the forward function and the gradient provider are returned
    /// unchanged. [`AttrError::LengthMismatch`] is returned if the provider yields a
    /// different number of gradients than there are inputs.
    pub fn attribute<'a>(
        &self,
        inputs: impl Into<Inputs<'a>>,
        target: Option<Target>,
        additional_forward_args: Option<&[ForwardArg]>,
    ) -> Result<Attributions> {
        let (is_inputs_tuple, inputs) = format_input(inputs.into());
        let args = format_additional_forward_args(additional_forward_args);
        debug!(
            inputs = inputs.len(),
            is_inputs_tuple,
            ?target,
            "computing input x gradient attributions"
        );

        let inputs = apply_gradient_requirements(inputs);
        let gradients = self
            .gradient_provider
            .gradients(&self.forward, &inputs, target.as_ref(), args)?;
        if gradients.len() != inputs.len() {
            return Err(AttrError::LengthMismatch {
                what: "gradients",
                expected: inputs.len(),
                got: gradients.len(),
            });
        }

        let attributions = inputs
            .iter()
            .zip(&gradients)
            .map(|(input, gradient)| cpu::hadamard(input, gradient))
            .collect::<Result<Vec<_>>>()?;
        drop(inputs);

        format_attributions(is_inputs_tuple, attributions)
    }
}
