//! Core hashing pipeline
//!
//! The bounded worker pool, the streaming stats aggregator and the
//! coordinator that ties them to the manifest writer.

mod dispatcher;
mod pipeline;
mod stats;

pub use dispatcher::*;
pub use pipeline::*;
pub use stats::*;
