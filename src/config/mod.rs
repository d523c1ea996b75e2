//! Configuration module for xxmanifest
//!
//! Provides CLI arguments, defaults and the validated runtime
//! configuration handed to the pipeline.

mod settings;

pub use settings::*;
