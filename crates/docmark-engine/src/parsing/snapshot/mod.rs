//! # Snapshot Support
//!
//! Helpers for looking at and checking token trees.
//!
//! - **`dump`**: renders a tree as indented text, one token per line, for
//!   assertions and for the command line front end.
//! - **`invariants`**: structural checks that hold for every parsed tree
//!   (children inside their parent's span, no pending tokens left).

pub mod dump;
pub mod invariants;

pub use dump::dump;
pub use invariants::{check as invariants, violations};
