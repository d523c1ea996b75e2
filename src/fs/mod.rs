//! File system module
//!
//! Directory enumeration and the pre-dispatch self-exclusion filter.

mod scanner;

pub use scanner::*;
