//! Progress reporter implementation
//!
//! Two indicatif bars (files and bytes hashed) plus a status line with the
//! most recent file or error.

use crate::core::{human_readable, HashObserver, RunStats};
use crate::hash::HashResult;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const MAX_STATUS_WIDTH: usize = 60;

/// Console progress for a manifest run
pub struct ProgressReporter {
    multi: MultiProgress,
    files_bar: ProgressBar,
    bytes_bar: ProgressBar,
    status: ProgressBar,
    start_time: Instant,
    total_files: AtomicU64,
    total_bytes: AtomicU64,
    files_done: AtomicU64,
    bytes_done: AtomicU64,
    errors: AtomicU64,
    enabled: AtomicBool,
}

fn style(template: &str, fallback: ProgressStyle) -> ProgressStyle {
    match ProgressStyle::default_bar().template(template) {
        Ok(style) => style.progress_chars("=> "),
        Err(e) => {
            tracing::debug!("progress template rejected: {}", e);
            fallback
        }
    }
}

impl ProgressReporter {
    /// Create a new progress reporter drawing to stderr
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let status = multi.add(ProgressBar::new_spinner());
        status.set_style(style("{spinner:.cyan} {msg}", ProgressStyle::default_spinner()));

        let files_bar = multi.add(ProgressBar::new(0));
        files_bar.set_style(style(
            "{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%)",
            ProgressStyle::default_bar(),
        ));
        files_bar.set_prefix("Files");

        let bytes_bar = multi.add(ProgressBar::new(0));
        bytes_bar.set_style(style(
            "{prefix:.bold.dim} [{bar:40.green/white}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})",
            ProgressStyle::default_bar(),
        ));
        bytes_bar.set_prefix("Data ");

        Self {
            multi,
            files_bar,
            bytes_bar,
            status,
            start_time: Instant::now(),
            total_files: AtomicU64::new(0),
            total_bytes: AtomicU64::new(0),
            files_done: AtomicU64::new(0),
            bytes_done: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a reporter that counts but never draws
    pub fn disabled() -> Self {
        let reporter = Self::new();
        reporter.enabled.store(false, Ordering::SeqCst);
        reporter.multi.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Check if drawing is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Set the expected totals
    pub fn set_totals(&self, files: u64, bytes: u64) {
        self.total_files.store(files, Ordering::Relaxed);
        self.total_bytes.store(bytes, Ordering::Relaxed);
        self.files_bar.set_length(files);
        self.bytes_bar.set_length(bytes);
    }

    /// Set the status line, truncating long paths from the left
    pub fn set_status(&self, msg: &str) {
        let chars = msg.chars().count();
        let display = if chars > MAX_STATUS_WIDTH {
            let tail: String = msg.chars().skip(chars - (MAX_STATUS_WIDTH - 3)).collect();
            format!("...{}", tail)
        } else {
            msg.to_string()
        };
        self.status.set_message(display);
    }

    /// Elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Current snapshot of the counters
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            total_files: self.total_files.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            files_done: self.files_done.load(Ordering::Relaxed),
            bytes_done: self.bytes_done.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl HashObserver for ProgressReporter {
    fn on_start(&self, files: u64, bytes: u64) {
        self.set_totals(files, bytes);
        self.set_status("Hashing...");
    }

    fn on_result(&self, result: &HashResult) {
        self.files_done.fetch_add(1, Ordering::Relaxed);
        self.files_bar.inc(1);

        match result {
            HashResult::Ok {
                relative_path, size, ..
            } => {
                self.bytes_done.fetch_add(*size, Ordering::Relaxed);
                self.bytes_bar.inc(*size);
                self.set_status(&relative_path.to_string_lossy());
            }
            HashResult::Err { path, .. } => {
                let errors = self.errors.fetch_add(1, Ordering::Relaxed) + 1;
                self.set_status(&format!("{} error(s), last: {}", errors, path.display()));
            }
        }
    }

    fn on_finish(&self, stats: &RunStats) {
        let message = format!(
            "Hashed {} files ({}) with {} error(s)",
            stats.files_total,
            human_readable(stats.bytes_total),
            stats.files_errored
        );
        if stats.is_success() {
            self.status.finish_with_message(format!("✓ {}", message));
            self.files_bar.finish();
            self.bytes_bar.finish();
        } else {
            self.status.finish_with_message(format!("✗ {}", message));
            self.files_bar.abandon();
            self.bytes_bar.abandon();
        }
    }
}

/// Counter snapshot
#[derive(Debug, Clone)]
pub struct ProgressSummary {
    /// Files expected
    pub total_files: u64,
    /// Bytes expected (sizes seen at scan time)
    pub total_bytes: u64,
    /// Results received
    pub files_done: u64,
    /// Bytes hashed
    pub bytes_done: u64,
    /// Error results received
    pub errors: u64,
    /// Elapsed time
    pub elapsed: Duration,
}

impl ProgressSummary {
    /// Completion percentage by file count
    pub fn percentage(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.files_done as f64 / self.total_files as f64) * 100.0
        }
    }
}
