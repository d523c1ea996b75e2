//! Manifest verification
//!
//! Re-hashes every file listed in a manifest on the same worker pool and
//! digest engine used to generate it, and classifies each entry.

use crate::config::MAX_WORKERS;
use crate::core::Dispatcher;
use crate::error::{IoResultExt, ManifestError, Result};
use crate::hash::{format_digest, hash_file};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub use crate::manifest::{parse_manifest, read_manifest, ManifestEntry};

/// Verification status of one manifest entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Digest matches
    Ok,
    /// Digest differs
    Corrupted,
    /// File no longer exists
    Missing,
    /// File exists but could not be read
    Error,
}

impl FileStatus {
    /// Short label for reports
    pub fn text(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Corrupted => "CORRUPTED",
            Self::Missing => "MISSING",
            Self::Error => "ERROR",
        }
    }
}

/// Outcome for one entry
#[derive(Debug, Clone)]
pub struct FileCheck {
    /// The manifest record
    pub entry: ManifestEntry,
    /// Classification
    pub status: FileStatus,
    /// Digest computed now, if the file was readable
    pub actual: Option<u64>,
    /// Error detail for `Error`
    pub message: Option<String>,
}

/// Result of verifying a whole manifest
#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// One check per manifest entry, sorted by manifest line
    pub checks: Vec<FileCheck>,
    /// Wall time
    pub elapsed: Duration,
}

impl VerifyReport {
    /// Number of entries with `status`
    pub fn count(&self, status: FileStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// Check if every entry matched
    pub fn is_success(&self) -> bool {
        self.checks.iter().all(|c| c.status == FileStatus::Ok)
    }

    /// Machine-readable report listing every entry that did not match
    pub fn to_json(&self) -> serde_json::Value {
        let failures: Vec<_> = self
            .checks
            .iter()
            .filter(|c| c.status != FileStatus::Ok)
            .map(|c| {
                serde_json::json!({
                    "path": c.entry.path,
                    "line": c.entry.line,
                    "status": c.status.text(),
                    "expected": format_digest(c.entry.digest),
                    "actual": c.actual.map(format_digest),
                    "message": c.message,
                })
            })
            .collect();

        serde_json::json!({
            "files_checked": self.checks.len(),
            "ok": self.count(FileStatus::Ok),
            "corrupted": self.count(FileStatus::Corrupted),
            "missing": self.count(FileStatus::Missing),
            "errors": self.count(FileStatus::Error),
            "elapsed_secs": self.elapsed.as_secs_f64(),
            "failures": failures,
        })
    }

    /// Print summary to console; `all` also lists matching files
    pub fn print_summary(&self, all: bool) {
        for check in &self.checks {
            if check.status == FileStatus::Ok && !all {
                continue;
            }
            match (&check.status, check.actual, &check.message) {
                (FileStatus::Corrupted, Some(actual), _) => println!(
                    "[{}] {} (expected {}, got {})",
                    check.status.text(),
                    check.entry.path,
                    format_digest(check.entry.digest),
                    format_digest(actual)
                ),
                (_, _, Some(message)) => {
                    println!("[{}] {}: {}", check.status.text(), check.entry.path, message)
                }
                _ => println!("[{}] {}", check.status.text(), check.entry.path),
            }
        }

        println!("\n=== Verification ===");
        println!("Files checked : {}", self.checks.len());
        println!("OK            : {}", self.count(FileStatus::Ok));
        println!("Corrupted     : {}", self.count(FileStatus::Corrupted));
        println!("Missing       : {}", self.count(FileStatus::Missing));
        println!("Errors        : {}", self.count(FileStatus::Error));
        println!("Elapsed       : {:.2} s", self.elapsed.as_secs_f64());
    }
}

/// Directory that `..\`-prefixed paths in `manifest` refer to: the parent
/// of the folder holding the manifest.
pub fn default_base_dir(manifest: &Path) -> Result<PathBuf> {
    let manifest = manifest.canonicalize().with_path(manifest)?;
    let base = manifest
        .parent()
        .and_then(Path::parent)
        .or_else(|| manifest.parent())
        .unwrap_or(Path::new("/"));
    Ok(base.to_path_buf())
}

/// Checks manifest entries against files under a base directory
pub struct Verifier {
    base_dir: PathBuf,
    threads: usize,
    full_load_threshold: u64,
}

impl Verifier {
    /// Create a verifier resolving entries against `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>, threads: usize, full_load_threshold: u64) -> Self {
        Self {
            base_dir: base_dir.into(),
            threads,
            full_load_threshold,
        }
    }

    /// Verify every entry. Fails before hashing if the worker count is
    /// above `MAX_WORKERS`.
    pub fn verify(&self, entries: Vec<ManifestEntry>) -> Result<VerifyReport> {
        if self.threads > MAX_WORKERS {
            return Err(ManifestError::config(format!(
                "threads must be at most {}, got {}",
                MAX_WORKERS, self.threads
            )));
        }

        let start = Instant::now();
        let base_dir = self.base_dir.clone();
        let threshold = self.full_load_threshold;

        tracing::info!(
            entries = entries.len(),
            "verifying against {}",
            base_dir.display()
        );

        let mut checks: Vec<FileCheck> = Dispatcher::new(self.threads)
            .dispatch(entries, move |entry: ManifestEntry| {
                check_entry(entry, &base_dir, threshold)
            })?
            .collect();

        checks.sort_by_key(|c| c.entry.line);

        Ok(VerifyReport {
            checks,
            elapsed: start.elapsed(),
        })
    }
}

fn check_entry(entry: ManifestEntry, base_dir: &Path, threshold: u64) -> FileCheck {
    let path = entry.resolve(base_dir);

    let size = match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => {
            return FileCheck {
                entry,
                status: FileStatus::Error,
                actual: None,
                message: Some("not a regular file".to_string()),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return FileCheck {
                entry,
                status: FileStatus::Missing,
                actual: None,
                message: None,
            }
        }
        Err(e) => {
            return FileCheck {
                entry,
                status: FileStatus::Error,
                actual: None,
                message: Some(e.to_string()),
            }
        }
    };

    match hash_file(&path, size, threshold) {
        Ok((actual, _)) => {
            let status = if actual == entry.digest {
                FileStatus::Ok
            } else {
                tracing::warn!("digest mismatch for {}", path.display());
                FileStatus::Corrupted
            };
            FileCheck {
                entry,
                status,
                actual: Some(actual),
                message: None,
            }
        }
        Err(e) => FileCheck {
            entry,
            status: FileStatus::Error,
            actual: None,
            message: Some(e.line_message()),
        },
    }
}
