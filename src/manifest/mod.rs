//! Manifest format
//!
//! Line-oriented text: one digest line or one error line per file.

mod parser;
mod writer;

pub use parser::*;
pub use writer::*;
