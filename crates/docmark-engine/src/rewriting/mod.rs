//! # Rewriting
//!
//! Parsed trees are refined by rewriters: small functions from one token to
//! an optional replacement, combined with [`Rewriter::Composite`],
//! [`Rewriter::Sequence`] and [`Rewriter::Loop`]. The [`RewriteEngine`] walks
//! the tree and repeats whole passes until nothing changes; unchanged
//! subtrees keep their `Arc`s, so "did anything change" is a pointer
//! comparison.
//!
//! [`Pipeline`] assembles the standard set of extension passes.

pub mod engine;
pub mod passes;
pub mod pipeline;
pub mod rewriter;

pub use engine::RewriteEngine;
pub use pipeline::Pipeline;
pub use rewriter::{RewriteFn, Rewriter};
