//! Choosing which output scalar to differentiate.
//!
//! Selection is expressed as a backward seed: a tensor shaped like the forward
//! output holding `1.0` at every selected position and `0.0` elsewhere. Seeding the
//! backward pass with it differentiates the batch sum of the selected scalars, which
//! gives per-example gradients because examples never interact.

use crate::error::{AttrError, Result};
use crate::tensors::{Ten64, Tensor};

/// Identifies the output scalar to explain for each example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Class index into the last axis of an `[N, C]` output.
    Index(usize),
    /// One index per non-batch axis of an `[N, d1, .., dk]` output.
    Multi(Vec<usize>),
    /// A class index per example; must have exactly `N` entries.
    PerExample(Vec<usize>),
}

impl From<usize> for Target {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Offset of `index` inside a row-major block of shape `dims`.
///
/// `index` may be shorter than `dims` as long as the remaining axes have size one,
/// in which case they contribute nothing to the offset.
fn flat_offset(index: &[usize], dims: &[usize], shape: &[usize]) -> Result<usize> {
    if index.len() > dims.len() || index.iter().zip(dims).any(|(i, d)| i >= d) {
        return Err(AttrError::TargetOutOfRange {
            index: index.to_vec(),
            shape: shape.to_vec(),
        });
    }
    if dims[index.len()..].iter().product::<usize>() != 1 {
        return Err(AttrError::MissingTarget {
            shape: shape.to_vec(),
        });
    }
    Ok(index
        .iter()
        .zip(dims)
        .fold(0, |offset, (&i, &d)| offset * d + i))
}

/// Builds the backward seed selecting `target` from an output of shape `shape`.
pub fn select_targets(shape: &[usize], target: Option<&Target>) -> Result<Ten64> {
    let Some((&batch, rest)) = shape.split_first() else {
        // a 0-d output is already the scalar to differentiate
        return match target {
            None => Ok(Tensor::ones(Vec::<usize>::new())),
            Some(t) => Err(AttrError::TargetOutOfRange {
                index: match t {
                    Target::Index(i) => vec![*i],
                    Target::Multi(v) | Target::PerExample(v) => v.clone(),
                },
                shape: Vec::new(),
            }),
        };
    };
    let per_example = rest.iter().product::<usize>();

    let offsets: Vec<usize> = match target {
        None => vec![flat_offset(&[], rest, shape)?; batch],
        Some(Target::Index(i)) => vec![flat_offset(&[*i], rest, shape)?; batch],
        Some(Target::Multi(index)) => vec![flat_offset(index, rest, shape)?; batch],
        Some(Target::PerExample(indices)) => {
            if indices.len() != batch {
                return Err(AttrError::TargetBatchMismatch {
                    expected: batch,
                    got: indices.len(),
                });
            }
            indices
                .iter()
                .map(|&i| flat_offset(&[i], rest, shape))
                .collect::<Result<_>>()?
        }
    };

    let mut seed = Tensor::zeros(shape.to_vec());
    for (n, offset) in offsets.into_iter().enumerate() {
        seed.data[n * per_example + offset] = 1.0;
    }
    Ok(seed)
}
