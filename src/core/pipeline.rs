//! Pipeline coordinator
//!
//! Resolves the source and output paths, removes self references from the
//! task list, drives the dispatcher and, for every completed result, writes
//! the manifest line and then records the stats. Only this thread touches
//! the output stream.

use crate::config::ManifestConfig;
use crate::core::{Dispatcher, RunStats, StatsAggregator};
use crate::error::{IoResultExt, ManifestError, Result};
use crate::fs::{exclude_self_references, FileTask, ScanConfig, Scanner};
use crate::hash::{digest, HashResult};
use crate::manifest::ManifestWriter;
use crate::progress::ProgressReporter;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Notified once per completed result, after it was written and recorded
pub trait HashObserver: Send + Sync {
    /// Called from the coordinator thread
    fn on_result(&self, result: &HashResult);

    /// Called once before dispatch with the task count and total size
    fn on_start(&self, _files: u64, _bytes: u64) {}

    /// Called once after the last result
    fn on_finish(&self, _stats: &RunStats) {}
}

impl<F> HashObserver for F
where
    F: Fn(&HashResult) + Send + Sync,
{
    fn on_result(&self, result: &HashResult) {
        self(result)
    }
}

/// Hash `tasks` and stream every result into `writer` and `stats`.
///
/// The caller owns task selection; nothing is filtered here. A write
/// failure aborts the run and is returned; per-file errors are not.
/// If the dispatcher was cancelled, the results already received are
/// written and `Cancelled` is returned.
pub fn hash_tasks<W: Write>(
    tasks: Vec<FileTask>,
    full_load_threshold: u64,
    dispatcher: &Dispatcher,
    writer: &mut ManifestWriter<W>,
    stats: &StatsAggregator,
    observer: Option<&dyn HashObserver>,
) -> Result<()> {
    let results = dispatcher.dispatch(tasks, move |task: FileTask| {
        digest(&task, full_load_threshold)
    })?;

    for result in results {
        writer.write(&result)?;
        stats.record(&result);
        if let Some(observer) = observer {
            observer.on_result(&result);
        }
    }

    if dispatcher.is_cancelled() {
        return Err(ManifestError::Cancelled);
    }

    Ok(())
}

/// Full run: scan, filter, hash, write, report
pub struct ManifestPipeline {
    config: ManifestConfig,
    observer: Option<Box<dyn HashObserver>>,
}

impl ManifestPipeline {
    /// Create a pipeline for the given configuration
    pub fn new(config: ManifestConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Attach an observer notified for every result
    pub fn with_observer(mut self, observer: impl HashObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Attach a progress bar
    pub fn with_progress(self, progress: ProgressReporter) -> Self {
        self.with_observer(progress)
    }

    /// Configuration in use
    pub fn config(&self) -> &ManifestConfig {
        &self.config
    }

    /// Absolute manifest path, creating the output directory if needed
    pub fn resolve_output_path(&self) -> Result<PathBuf> {
        let output_dir = &self.config.output_dir;
        std::fs::create_dir_all(output_dir).with_output_path(output_dir)?;
        let output_dir = output_dir
            .canonicalize()
            .with_output_path(output_dir)?;
        Ok(output_dir.join(&self.config.output_name))
    }

    /// Scan the source and drop the manifest and the tool itself
    pub fn collect_tasks(&self, output_path: &Path) -> Result<Vec<FileTask>> {
        let scanner = Scanner::new(ScanConfig {
            follow_symlinks: self.config.follow_symlinks,
            include_hidden: self.config.include_hidden,
            exclude_patterns: self.config.exclude_patterns.clone(),
        })?;

        let scan = scanner.scan(&self.config.source)?;
        if !scan.errors.is_empty() {
            tracing::warn!("{} entries could not be read during the scan", scan.errors.len());
        }

        Ok(exclude_self_references(
            scan.files,
            output_path,
            self.config.exclude_name.as_deref(),
        ))
    }

    /// Execute the run, returning the manifest path and its statistics
    pub fn run(&self) -> Result<(PathBuf, RunStats)> {
        self.config.validate()?;

        if !self.config.source.exists() {
            return Err(ManifestError::NotFound(self.config.source.clone()));
        }

        let output_path = self.resolve_output_path()?;
        let tasks = self.collect_tasks(&output_path)?;

        let total_bytes = tasks.iter().map(|t| t.size).sum();
        tracing::info!(
            files = tasks.len(),
            bytes = total_bytes,
            "hashing {} into {}",
            self.config.source.display(),
            output_path.display()
        );

        let mut writer = ManifestWriter::create(&output_path)?;
        let dispatcher = Dispatcher::new(self.config.threads);
        let stats = StatsAggregator::new();
        let observer = self.observer.as_deref();

        if let Some(observer) = observer {
            observer.on_start(tasks.len() as u64, total_bytes);
        }

        let start = Instant::now();
        hash_tasks(
            tasks,
            self.config.full_load_threshold,
            &dispatcher,
            &mut writer,
            &stats,
            observer,
        )?;
        writer.finish()?;
        let run_stats = stats.finalize(start.elapsed());

        if let Some(observer) = observer {
            observer.on_finish(&run_stats);
        }

        tracing::info!(
            files = run_stats.files_total,
            errors = run_stats.files_errored,
            bytes = run_stats.bytes_total,
            "done in {:.2?}",
            run_stats.elapsed
        );

        Ok((output_path, run_stats))
    }
}
