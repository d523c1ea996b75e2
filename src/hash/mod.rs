//! Hash computation module
//!
//! XXH3-64 digests with size-based choice between buffered
//! and memory-mapped reads.

mod engine;

pub use engine::*;
