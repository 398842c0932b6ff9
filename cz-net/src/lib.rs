//! cz-net: a small multilayer perceptron with bespoke forward/backward.
//!
//! The computation graph is a fixed chain of edges (each a value vector with a
//! parallel gradient vector) connected by three node kinds: affine map, leaky
//! ReLU, and a combined softmax-plus-sigmoid head. Training is plain SGD with
//! weight decay, fused into the backward pass, one example at a time.

mod mlp;

#[cfg(test)]
mod mlp_tests;

pub use mlp::{Mlp, TrainStep};
