//! # Models
//!
//! Sampled parameters of a tree-dating model and the context they are
//! updated in.

pub mod context;
pub mod parameter;
pub mod shape;
pub mod speciation;
