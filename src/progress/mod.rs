//! Progress reporting module
//!
//! Live file and byte counters for manifest generation.

mod reporter;

pub use reporter::*;
