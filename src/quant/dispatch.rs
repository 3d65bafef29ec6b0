//! Operation dispatch boundary for quantized tensors
//!
//! The operation registry living outside this crate maps operation names
//! to specialized quantized kernels. This module provides the boundary
//! pieces it consumes: the argument tree, the dequantize-everything
//! fallback, and a name → handler table with fallback dispatch.

use std::collections::HashMap;

use tracing::trace;

use crate::autograd::Tensor;

use super::qtensor::QTensor;

/// Argument tree passed to a dispatched operation.
#[derive(Clone, Debug)]
pub enum OpArg {
    /// A plain tensor argument.
    Plain(Tensor),
    /// A quantized tensor argument.
    Quantized(QTensor),
    /// A nested list of arguments.
    List(Vec<OpArg>),
}

impl OpArg {
    /// Replace every quantized node with its dequantized form.
    fn dequantized(&self) -> OpArg {
        match self {
            OpArg::Plain(t) => OpArg::Plain(t.clone()),
            OpArg::Quantized(q) => OpArg::Plain(q.dequantize()),
            OpArg::List(items) => OpArg::List(items.iter().map(Self::dequantized).collect()),
        }
    }

    /// The plain tensor held by this node, if it is one.
    pub fn as_plain(&self) -> Option<&Tensor> {
        match self {
            OpArg::Plain(t) => Some(t),
            _ => None,
        }
    }

    /// The quantized tensor held by this node, if it is one.
    pub fn as_quantized(&self) -> Option<&QTensor> {
        match self {
            OpArg::Quantized(q) => Some(q),
            _ => None,
        }
    }
}

/// Fallback path for operations without a specialized quantized kernel.
///
/// Every [`OpArg::Quantized`] node in the argument tree is replaced by its
/// dequantized tensor, then the plain operation is invoked on the mapped
/// tree.
pub fn qfallback<F, R>(op: F, args: &[OpArg]) -> R
where
    F: FnOnce(&[OpArg]) -> R,
{
    let args: Vec<OpArg> = args.iter().map(OpArg::dequantized).collect();
    op(&args)
}

/// A specialized handler for one operation on quantized inputs.
pub type QOpHandler = fn(&[OpArg]) -> Tensor;

/// Registry mapping operation names to specialized quantized handlers.
///
/// [`OpRegistry::dispatch`] prefers a registered handler and otherwise
/// falls back to [`qfallback`].
#[derive(Default)]
pub struct OpRegistry {
    handlers: HashMap<&'static str, QOpHandler>,
}

impl OpRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a specialized handler for an operation name.
    pub fn register(&mut self, name: &'static str, handler: QOpHandler) {
        self.handlers.insert(name, handler);
    }

    /// Look up the handler registered for an operation name.
    pub fn get(&self, name: &str) -> Option<QOpHandler> {
        self.handlers.get(name).copied()
    }

    /// Run an operation, preferring its specialized quantized handler.
    pub fn dispatch<F>(&self, name: &str, op: F, args: &[OpArg]) -> Tensor
    where
        F: FnOnce(&[OpArg]) -> Tensor,
    {
        match self.get(name) {
            Some(handler) => {
                trace!(op = name, "dispatching to specialized quantized handler");
                handler(args)
            }
            None => {
                trace!(op = name, "no quantized handler, dequantize fallback");
                qfallback(op, args)
            }
        }
    }
}
