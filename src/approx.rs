//! Utilities to approximate equality of floating point values.
//!
//! Used to compare attributions and gradients, which pass through enough floating
//! point arithmetic that exact equality is rarely the right question.

use crate::tensors::Ten64;

/// The max epsilon accepted on `f64`s.
pub const F64_MAX_ERROR: f64 = 1e-3;

/// The expected minimum epsilon accepted on `f64`s.
pub const F64_AVG_ERROR: f64 = 1e-6;

/// The best expected epsilon accepted on `f64`s.
pub const F64_MIN_ERROR: f64 = 1e-13;

/// Checks the absolute distance against the epsilons above.
pub trait RelativeEq<Rhs: ?Sized> {
    /// Enumerates the equality of `self` and `rhs`.
    fn approx_eq(&self, rhs: &Rhs) -> ApproxEquality;
}

impl RelativeEq<Self> for f64 {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        let dif = (self - rhs).abs();

        if dif < F64_MIN_ERROR {
            ApproxEquality::Precise
        } else if dif < F64_AVG_ERROR {
            ApproxEquality::Partial
        } else if dif < F64_MAX_ERROR {
            ApproxEquality::Relative
        } else {
            ApproxEquality::Scarce
        }
    }
}

impl RelativeEq<Self> for [f64] {
    /// The worst rating over all element pairs; slices of different lengths are `Scarce`.
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        if self.len() != rhs.len() {
            return ApproxEquality::Scarce;
        }
        self.iter()
            .zip(rhs)
            .map(|(a, b)| a.approx_eq(b))
            .max()
            .unwrap_or(ApproxEquality::Precise)
    }
}

impl RelativeEq<Self> for Ten64 {
    /// Shapes must match exactly; the differentiability flag is ignored.
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        if self.shape != rhs.shape {
            return ApproxEquality::Scarce;
        }
        self.data.as_slice().approx_eq(rhs.data.as_slice())
    }
}

/// Enumeration of how close two values are, best first.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApproxEquality {
    /// Very strong epsilon.
    Precise = 0,

    /// Good epsilon.
    Partial = 1,

    /// Acceptable epsilon
    Relative = 2,

    /// No relative equality.
    Scarce = 3,
}

/// Whether `a` and `b` agree within [`F64_MIN_ERROR`].
pub fn approx_eq<A: RelativeEq<B> + ?Sized, B: ?Sized>(a: &A, b: &B) -> bool {
    a.approx_eq(b) == ApproxEquality::Precise
}

/// Whether `a` and `b` agree within [`F64_MAX_ERROR`].
pub fn roughly_eq<A: RelativeEq<B> + ?Sized, B: ?Sized>(a: &A, b: &B) -> bool {
    a.approx_eq(b) <= ApproxEquality::Relative
}
