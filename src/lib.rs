//! # xxmanifest - Parallel XXH3 File Manifests
//!
//! xxmanifest walks a directory tree, hashes every regular file with
//! XXH3-64 on a bounded pool of worker threads and writes a manifest with
//! one line per file. Small files are read in one go; large files are
//! memory-mapped and streamed through the hasher.
//!
//! ## Features
//!
//! - **Bounded worker pool**: fixed number of threads fed through crossbeam channels
//! - **Size-based I/O**: full reads below a threshold, mmap above it
//! - **Streaming output**: one writer, lines in completion order, no buffering of results
//! - **Self-exclusion**: the manifest and the executable are never hashed
//! - **Verification**: re-check a manifest and report corrupted or missing files
//!
//! ## Quick Start
//!
//! ```no_run
//! use xxmanifest::config::ManifestConfig;
//! use xxmanifest::core::ManifestPipeline;
//! use std::path::PathBuf;
//!
//! let config = ManifestConfig {
//!     source: PathBuf::from("/data"),
//!     output_dir: PathBuf::from("/data/xxHash"),
//!     threads: 8,
//!     ..Default::default()
//! };
//!
//! let (manifest, stats) = ManifestPipeline::new(config).run().unwrap();
//! stats.print_summary(&manifest);
//! ```
//!
//! ## Verification
//!
//! ```no_run
//! use xxmanifest::manifest::read_manifest;
//! use xxmanifest::verify::{default_base_dir, Verifier};
//! use std::path::Path;
//!
//! let manifest = Path::new("/data/xxHash/CRC.xxhash3");
//! let entries = read_manifest(manifest).unwrap();
//! let base = default_base_dir(manifest).unwrap();
//!
//! let report = Verifier::new(base, 0, 200 * 1024 * 1024).verify(entries).unwrap();
//! report.print_summary(false);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod hash;
pub mod manifest;
pub mod progress;
pub mod verify;

// Re-export commonly used types
pub use config::ManifestConfig;
pub use core::{ManifestPipeline, RunStats};
pub use error::{ManifestError, Result};
pub use progress::ProgressReporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use xxmanifest::prelude::*;
    //! ```

    pub use crate::config::{ManifestConfig, DEFAULT_FULL_LOAD_LIMIT};
    pub use crate::core::{hash_tasks, Dispatcher, HashObserver, ManifestPipeline, RunStats, StatsAggregator};
    pub use crate::error::{ManifestError, Result};
    pub use crate::fs::{exclude_self_references, FileTask, ScanConfig, Scanner};
    pub use crate::hash::{digest, hash_file, HashResult, IoStrategy};
    pub use crate::manifest::{parse_manifest, read_manifest, ManifestEntry, ManifestWriter};
    pub use crate::progress::ProgressReporter;
    pub use crate::verify::{FileStatus, Verifier, VerifyReport};
}
