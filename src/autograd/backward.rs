//! Backward operation trait for the gradient tape

/// A node in the backward graph.
///
/// Every operation that participates in autograd attaches one of these to
/// its result tensor. `backward` reads the result's accumulated gradient,
/// propagates it into the operation's inputs, and recurses into their
/// backward ops.
pub trait BackwardOp {
    /// Propagate the result gradient to the operation inputs.
    fn backward(&self);
}
