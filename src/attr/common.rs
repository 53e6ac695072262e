//! Boundary types and the helpers that normalize them.
//!
//! Callers hand over either one tensor or a tuple of tensors and get back the
//! same form. Internally everything runs on a slice plus a single `is_tuple` tag,
//! decided once by [`format_input`] and consumed once by [`format_attributions`].

use crate::error::{AttrError, Result};
use crate::tensors::Ten64;

/// Tensors to attribute, borrowed mutably from the caller for the duration of one call.
///
/// The mutable borrow covers the transient `requires_grad` toggle; data is never written.
#[derive(Debug)]
pub enum Inputs<'a> {
    /// A model taking a single tensor.
    Single(&'a mut Ten64),
    /// A model taking several tensors, aligned along the batch axis.
    Tuple(&'a mut [Ten64]),
}

impl<'a> From<&'a mut Ten64> for Inputs<'a> {
    fn from(t: &'a mut Ten64) -> Self {
        Self::Single(t)
    }
}

impl<'a> From<&'a mut [Ten64]> for Inputs<'a> {
    fn from(ts: &'a mut [Ten64]) -> Self {
        Self::Tuple(ts)
    }
}

impl<'a> From<&'a mut Vec<Ten64>> for Inputs<'a> {
    fn from(ts: &'a mut Vec<Ten64>) -> Self {
        Self::Tuple(ts.as_mut_slice())
    }
}

impl<'a, const N: usize> From<&'a mut [Ten64; N]> for Inputs<'a> {
    fn from(ts: &'a mut [Ten64; N]) -> Self {
        Self::Tuple(ts.as_mut_slice())
    }
}

/// Attribution scores, mirroring the form of the [`Inputs`] they were computed for.
#[derive(Debug, Clone, PartialEq)]
pub enum Attributions {
    /// Result for [`Inputs::Single`].
    Single(Ten64),
    /// Result for [`Inputs::Tuple`], one tensor per input in the same order.
    Tuple(Vec<Ten64>),
}

impl Attributions {
    /// Whether the inputs were given as a tuple.
    pub fn is_tuple(&self) -> bool {
        matches!(self, Self::Tuple(_))
    }

    /// Number of attribution tensors.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Tuple(ts) => ts.len(),
        }
    }

    /// Whether there are no attribution tensors (only possible for an empty tuple).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tensors as a slice, regardless of form.
    pub fn as_slice(&self) -> &[Ten64] {
        match self {
            Self::Single(t) => std::slice::from_ref(t),
            Self::Tuple(ts) => ts,
        }
    }

    /// The single tensor, if the inputs were not a tuple.
    pub fn into_single(self) -> Option<Ten64> {
        match self {
            Self::Single(t) => Some(t),
            Self::Tuple(_) => None,
        }
    }

    /// The tensors as a vector, regardless of form.
    pub fn into_vec(self) -> Vec<Ten64> {
        match self {
            Self::Single(t) => vec![t],
            Self::Tuple(ts) => ts,
        }
    }
}

/// Extra values passed to the forward function after the attributed inputs.
///
/// They are never differentiated.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardArg {
    Tensor(Ten64),
    Scalar(f64),
    Int(i64),
    Bool(bool),
}

impl ForwardArg {
    /// The tensor, if this argument is one.
    pub fn as_tensor(&self) -> Option<&Ten64> {
        match self {
            Self::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// The value as a float; integers are converted.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(x) => Some(*x),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The integer, if this argument is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The boolean, if this argument is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<Ten64> for ForwardArg {
    fn from(t: Ten64) -> Self {
        Self::Tensor(t)
    }
}

impl From<f64> for ForwardArg {
    fn from(x: f64) -> Self {
        Self::Scalar(x)
    }
}

impl From<i64> for ForwardArg {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for ForwardArg {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Looks up the tensor at `index`, failing with [`AttrError::InvalidArgument`]
/// when it is missing or of another kind.
pub fn tensor_arg(args: &[ForwardArg], index: usize) -> Result<&Ten64> {
    args.get(index)
        .and_then(ForwardArg::as_tensor)
        .ok_or(AttrError::InvalidArgument {
            index,
            expected: "tensor",
        })
}

/// Looks up the number at `index`, failing with [`AttrError::InvalidArgument`]
/// when it is missing or of another kind.
pub fn scalar_arg(args: &[ForwardArg], index: usize) -> Result<f64> {
    args.get(index)
        .and_then(ForwardArg::as_scalar)
        .ok_or(AttrError::InvalidArgument {
            index,
            expected: "number",
        })
}

/// Normalizes inputs into a slice and reports whether they came as a tuple.
pub fn format_input<'a>(inputs: Inputs<'a>) -> (bool, &'a mut [Ten64]) {
    match inputs {
        Inputs::Single(t) => (false, std::slice::from_mut(t)),
        Inputs::Tuple(ts) => (true, ts),
    }
}

/// Treats absent additional arguments as an empty list.
pub fn format_additional_forward_args(args: Option<&[ForwardArg]>) -> &[ForwardArg] {
    args.unwrap_or_default()
}

/// Restores the caller's calling convention on the computed attributions.
///
/// A non-tuple call must produce exactly one tensor.
pub fn format_attributions(
    is_inputs_tuple: bool,
    attributions: Vec<Ten64>,
) -> Result<Attributions> {
    if is_inputs_tuple {
        return Ok(Attributions::Tuple(attributions));
    }
    let got = attributions.len();
    match <[Ten64; 1]>::try_from(attributions) {
        Ok([single]) => Ok(Attributions::Single(single)),
        Err(_) => Err(AttrError::LengthMismatch {
            what: "attributions",
            expected: 1,
            got,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor;

    #[test]
    fn single_tensor_becomes_one_element_slice() {
        let mut x = tensor!([[1.0, 2.0]]);
        let (is_tuple, slice) = format_input(Inputs::from(&mut x));
        assert!(!is_tuple);
        assert_eq!(slice.len(), 1);
        assert_eq!(slice[0].data, vec![1.0, 2.0]);
    }

    #[test]
    fn one_element_tuple_stays_a_tuple() {
        let mut xs = [tensor!([[1.0]])];
        let (is_tuple, slice) = format_input(Inputs::from(&mut xs));
        assert!(is_tuple);
        assert_eq!(slice.len(), 1);

        let out = format_attributions(true, vec![tensor!([[2.0]])]).unwrap();
        assert!(out.is_tuple());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn non_tuple_requires_exactly_one_attribution() {
        let out = format_attributions(false, vec![tensor!([1.0])]).unwrap();
        assert_eq!(out, Attributions::Single(tensor!([1.0])));

        let err = format_attributions(false, vec![tensor!([1.0]), tensor!([2.0])]).unwrap_err();
        assert_eq!(
            err,
            AttrError::LengthMismatch {
                what: "attributions",
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn argument_accessors_report_position() {
        let args = [ForwardArg::from(2_i64), ForwardArg::from(tensor!([1.0]))];
        assert_eq!(scalar_arg(&args, 0).unwrap(), 2.0);
        assert_eq!(tensor_arg(&args, 1).unwrap().data, vec![1.0]);
        assert_eq!(
            tensor_arg(&args, 0).unwrap_err(),
            AttrError::InvalidArgument {
                index: 0,
                expected: "tensor"
            }
        );
        assert!(scalar_arg(&args, 5).is_err());
        assert!(format_additional_forward_args(None).is_empty());
    }
}
