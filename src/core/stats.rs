//! Run statistics
//!
//! Counters are atomics so a progress display can read them while the
//! coordinator records results.

use crate::hash::HashResult;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Format a byte count with binary units and two decimals ("1.50 KiB")
pub fn human_readable(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Streaming accumulator fed once per result
#[derive(Debug, Default)]
pub struct StatsAggregator {
    files_total: AtomicU64,
    files_errored: AtomicU64,
    bytes_total: AtomicU64,
}

impl StatsAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one result
    pub fn record(&self, result: &HashResult) {
        self.files_total.fetch_add(1, Ordering::Relaxed);
        match result {
            HashResult::Ok { size, .. } => {
                self.bytes_total.fetch_add(*size, Ordering::Relaxed);
            }
            HashResult::Err { .. } => {
                self.files_errored.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Files recorded so far
    pub fn files_total(&self) -> u64 {
        self.files_total.load(Ordering::Relaxed)
    }

    /// Errors recorded so far
    pub fn files_errored(&self) -> u64 {
        self.files_errored.load(Ordering::Relaxed)
    }

    /// Bytes hashed so far
    pub fn bytes_total(&self) -> u64 {
        self.bytes_total.load(Ordering::Relaxed)
    }

    /// Live counts; `elapsed` is left at zero
    pub fn snapshot(&self) -> RunStats {
        RunStats {
            files_total: self.files_total(),
            files_errored: self.files_errored(),
            bytes_total: self.bytes_total(),
            elapsed: Duration::ZERO,
        }
    }

    /// Freeze the counters into a report
    pub fn finalize(&self, elapsed: Duration) -> RunStats {
        RunStats {
            elapsed,
            ..self.snapshot()
        }
    }
}

/// Final statistics of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Files processed (hashed or errored)
    pub files_total: u64,
    /// Files that produced an error line
    pub files_errored: u64,
    /// Bytes hashed successfully
    pub bytes_total: u64,
    /// Wall time of the hashing phase
    pub elapsed: Duration,
}

impl RunStats {
    /// Average throughput in bytes/second (0 if no time elapsed)
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_total as f64 / secs
        } else {
            0.0
        }
    }

    /// Files hashed without error
    pub fn files_ok(&self) -> u64 {
        self.files_total - self.files_errored
    }

    /// Check if every file was hashed
    pub fn is_success(&self) -> bool {
        self.files_errored == 0
    }

    /// Print summary to console
    pub fn print_summary(&self, output: &Path) {
        println!("\nDone! Hashes saved to: {}", output.display());
        println!("=== Statistics ===");
        println!("Files processed : {}", self.files_total);
        println!("Errors          : {}", self.files_errored);
        println!("Total volume    : {}", human_readable(self.bytes_total));
        println!("Elapsed         : {:.2} s", self.elapsed.as_secs_f64());
        println!("Throughput      : {}/s", human_readable(self.throughput() as u64));
    }

    /// Machine-readable report
    pub fn to_json(&self, output: &Path) -> serde_json::Value {
        serde_json::json!({
            "manifest": output.display().to_string(),
            "files_total": self.files_total,
            "files_errored": self.files_errored,
            "bytes_total": self.bytes_total,
            "bytes_total_human": human_readable(self.bytes_total),
            "elapsed_secs": self.elapsed.as_secs_f64(),
            "throughput_bytes_per_sec": self.throughput(),
            "throughput_human": format!("{}/s", human_readable(self.throughput() as u64)),
        })
    }
}
