//! Differentiable operations and autograd utilities.
//!
//! # Reverse-Mode Tape
//!
//! A [`Tape`] records every operation of a forward pass as a node in an arena.
//! Each node keeps its forward value and, when it depends on a tracked leaf, the
//! backward closure produced by its kernel in [`crate::ops::cpu`].
//!
//! ## Autograd Pattern
//!
//! 1. **Leaves** enter the tape with [`Tape::input`] (tracked iff the tensor's
//!    `requires_grad` flag is on) or [`Tape::constant`] (never tracked).
//! 2. **Forward Pass** calls op methods such as [`Tape::matmul`] or [`Tape::relu`],
//!    each returning a [`Var`] handle.
//! 3. **Backward Pass** ([`Tape::backward`]) walks the nodes in reverse recording
//!    order and accumulates gradients into every tracked node.
//!
//! ## Usage Guidelines
//!
//! - Shape mismatches are reported as [`AttrError`], not panics.
//! - A [`Var`] is only meaningful for the tape that created it; handles from
//!   another tape are rejected with [`AttrError::UnknownVar`] when out of range.
//! - Nodes that do not depend on a tracked leaf keep no backward closure.
//!
//! # Example
//! ```rust
//! use briny_attr::backprop::Tape;
//! use briny_attr::tensor;
//!
//! let x = tensor!([[1.0, 2.0, 3.0]]).with_requires_grad(true);
//! let tape = Tape::new();
//! let v = tape.input(&x);
//! let y = tape.sum_per_example(v).unwrap();
//! let grads = tape.backward(y, &tensor!([1.0])).unwrap();
//! assert_eq!(grads.wrt(v).unwrap().data, vec![1.0, 1.0, 1.0]);
//! ```

use std::cell::RefCell;

use tracing::debug;

use crate::error::{AttrError, Result};
use crate::ops::{cpu, BinaryBack, UnaryBack};
use crate::tensors::Ten64;

/// Handle to a node recorded on a [`Tape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var(usize);

impl Var {
    /// Position of the node in recording order.
    pub fn index(self) -> usize {
        self.0
    }
}

enum Backward {
    None,
    Unary {
        parent: usize,
        back: Box<UnaryBack>,
    },
    Binary {
        lhs: usize,
        rhs: usize,
        back: Box<BinaryBack>,
    },
}

struct Node {
    value: Ten64,
    tracked: bool,
    backward: Backward,
}

/// Arena of recorded operations for one forward pass.
#[derive(Default)]
pub struct Tape {
    nodes: RefCell<Vec<Node>>,
}

impl Tape {
    /// An empty tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded nodes.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    fn push(&self, value: Ten64, tracked: bool, backward: Backward) -> Var {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Node {
            value: value.with_requires_grad(tracked),
            tracked,
            backward,
        });
        Var(nodes.len() - 1)
    }

    /// Records `tensor` as a leaf. It is tracked iff its `requires_grad` flag is set.
    pub fn input(&self, tensor: &Ten64) -> Var {
        self.push(tensor.clone(), tensor.requires_grad(), Backward::None)
    }

    /// Records `tensor` as a leaf that never receives gradients.
    pub fn constant(&self, tensor: Ten64) -> Var {
        self.push(tensor, false, Backward::None)
    }

    /// Clone of the value held by `var`.
    pub fn value(&self, var: Var) -> Result<Ten64> {
        let nodes = self.nodes.borrow();
        Ok(node(&nodes, var)?.value.clone())
    }

    /// Shape of the value held by `var`.
    pub fn shape(&self, var: Var) -> Result<Vec<usize>> {
        let nodes = self.nodes.borrow();
        Ok(node(&nodes, var)?.value.shape.clone())
    }

    /// Whether `var` depends on at least one tracked leaf.
    pub fn is_tracked(&self, var: Var) -> Result<bool> {
        let nodes = self.nodes.borrow();
        Ok(node(&nodes, var)?.tracked)
    }

    fn unary(
        &self,
        x: Var,
        kernel: impl FnOnce(&Ten64) -> Result<(Ten64, Box<UnaryBack>)>,
    ) -> Result<Var> {
        let (out, back, tracked) = {
            let nodes = self.nodes.borrow();
            let parent = node(&nodes, x)?;
            let (out, back) = kernel(&parent.value)?;
            (out, back, parent.tracked)
        };
        let backward = if tracked {
            Backward::Unary { parent: x.0, back }
        } else {
            Backward::None
        };
        Ok(self.push(out, tracked, backward))
    }

    fn binary(
        &self,
        a: Var,
        b: Var,
        kernel: impl FnOnce(&Ten64, &Ten64) -> Result<(Ten64, Box<BinaryBack>)>,
    ) -> Result<Var> {
        let (out, back, tracked) = {
            let nodes = self.nodes.borrow();
            let (lhs, rhs) = (node(&nodes, a)?, node(&nodes, b)?);
            let (out, back) = kernel(&lhs.value, &rhs.value)?;
            (out, back, lhs.tracked || rhs.tracked)
        };
        let backward = if tracked {
            Backward::Binary {
                lhs: a.0,
                rhs: b.0,
                back,
            }
        } else {
            Backward::None
        };
        Ok(self.push(out, tracked, backward))
    }

    /// Elementwise `a + b`.
    pub fn add(&self, a: Var, b: Var) -> Result<Var> {
        self.binary(a, b, cpu::add)
    }

    /// Elementwise `a - b`.
    pub fn sub(&self, a: Var, b: Var) -> Result<Var> {
        self.binary(a, b, cpu::sub)
    }

    /// Elementwise `a * b`.
    pub fn mul(&self, a: Var, b: Var) -> Result<Var> {
        self.binary(a, b, cpu::mul)
    }

    /// Matrix product of two 2-D values.
    pub fn matmul(&self, a: Var, b: Var) -> Result<Var> {
        self.binary(a, b, cpu::matmul)
    }

    /// `k * x`.
    pub fn scale(&self, x: Var, k: f64) -> Result<Var> {
        self.unary(x, |v| Ok(cpu::scale(v, k)))
    }

    /// `x + k`.
    pub fn add_scalar(&self, x: Var, k: f64) -> Result<Var> {
        self.unary(x, |v| Ok(cpu::add_scalar(v, k)))
    }

    /// Elementwise `x²`.
    pub fn square(&self, x: Var) -> Result<Var> {
        self.unary(x, |v| Ok(cpu::square(v)))
    }

    /// `max(0, x)`.
    pub fn relu(&self, x: Var) -> Result<Var> {
        self.unary(x, |v| Ok(cpu::relu(v)))
    }

    /// Logistic sigmoid.
    pub fn sigmoid(&self, x: Var) -> Result<Var> {
        self.unary(x, |v| Ok(cpu::sigmoid(v)))
    }

    /// Hyperbolic tangent.
    pub fn tanh(&self, x: Var) -> Result<Var> {
        self.unary(x, |v| Ok(cpu::tanh(v)))
    }

    /// Sums all non-batch axes, giving one value per example.
    pub fn sum_per_example(&self, x: Var) -> Result<Var> {
        self.unary(x, cpu::sum_per_example)
    }

    /// Sums everything into a 0-d scalar.
    pub fn sum(&self, x: Var) -> Result<Var> {
        self.unary(x, |v| Ok(cpu::sum(v)))
    }

    /// Propagates `seed` (the gradient of some scalar objective with respect to
    /// `output`) back through the recorded nodes.
    ///
    /// Nodes recorded after `output` are ignored.
    pub fn backward(&self, output: Var, seed: &Ten64) -> Result<Gradients> {
        let nodes = self.nodes.borrow();
        let out = node(&nodes, output)?;
        if out.value.shape != seed.shape {
            return Err(AttrError::ShapeMismatch {
                op: "backward",
                lhs: out.value.shape.clone(),
                rhs: seed.shape.clone(),
            });
        }

        let mut grads: Vec<Option<Ten64>> = vec![None; output.0 + 1];
        if !out.tracked {
            return Ok(Gradients { grads });
        }
        grads[output.0] = Some(seed.detach());
        debug!(nodes = output.0 + 1, "running backward pass");

        for i in (0..=output.0).rev() {
            let (lower, upper) = grads.split_at_mut(i);
            let Some(grad) = upper[0].as_ref() else {
                continue;
            };
            match &nodes[i].backward {
                Backward::None => {}
                Backward::Unary { parent, back } => {
                    if nodes[*parent].tracked {
                        accumulate(&mut lower[*parent], back(grad));
                    }
                }
                Backward::Binary { lhs, rhs, back } => {
                    let (ga, gb) = back(grad);
                    if nodes[*lhs].tracked {
                        accumulate(&mut lower[*lhs], ga);
                    }
                    if nodes[*rhs].tracked {
                        accumulate(&mut lower[*rhs], gb);
                    }
                }
            }
        }

        Ok(Gradients { grads })
    }
}

/// Looks up `var`, rejecting handles recorded on another tape.
fn node(nodes: &[Node], var: Var) -> Result<&Node> {
    nodes.get(var.0).ok_or(AttrError::UnknownVar {
        index: var.0,
        len: nodes.len(),
    })
}

fn accumulate(slot: &mut Option<Ten64>, grad: Ten64) {
    match slot {
        Some(acc) => {
            for (a, g) in acc.data.iter_mut().zip(&grad.data) {
                *a += g;
            }
        }
        None => *slot = Some(grad),
    }
}

/// Gradients produced by [`Tape::backward`], indexed by [`Var`].
#[derive(Debug, Clone)]
pub struct Gradients {
    grads: Vec<Option<Ten64>>,
}

impl Gradients {
    /// Gradient with respect to `var`, or `None` when no path from the output reached it.
    pub fn wrt(&self, var: Var) -> Option<&Ten64> {
        self.grads.get(var.0).and_then(Option::as_ref)
    }

    /// Removes and returns the gradient with respect to `var`.
    pub fn take(&mut self, var: Var) -> Option<Ten64> {
        self.grads.get_mut(var.0).and_then(Option::take)
    }
}
