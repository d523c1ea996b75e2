//! Configuration settings for xxmanifest
//!
//! Defines the CLI arguments, their defaults, and the runtime
//! configuration consumed by the hashing pipeline.

use crate::error::{ManifestError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

/// Files at or below this size are read fully into memory (200 MiB)
pub const DEFAULT_FULL_LOAD_LIMIT: u64 = 200 * 1024 * 1024;

/// Default manifest directory, relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "xxHash";

/// Default manifest file name
pub const DEFAULT_OUTPUT_NAME: &str = "CRC.xxhash3";

/// Upper bound on the worker pool size
pub const MAX_WORKERS: usize = 1024;

/// xxmanifest - parallel XXH3 manifests for file trees
#[derive(Parser, Debug, Clone)]
#[command(name = "xxmanifest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate and verify XXH3-64 manifests for every file in a folder")]
#[command(long_about = r#"
xxmanifest hashes every regular file under a source directory with XXH3-64
and writes one line per file:

  <digest> *..\<relative/path>

Small files are read in one go, large files are memory-mapped.

Examples:
  xxmanifest                                   # hash ./ into ./xxHash/CRC.xxhash3
  xxmanifest -s /data -o /tmp/out -t 16        # custom source, output and threads
  xxmanifest --full-load-limit 64M             # mmap everything above 64 MiB
  xxmanifest verify xxHash/CRC.xxhash3         # re-check a manifest
"#)]
pub struct CliArgs {
    /// Source directory
    #[arg(short = 's', long, default_value = ".", value_name = "DIR")]
    pub source: PathBuf,

    /// Output directory for the manifest
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Manifest file name
    #[arg(short = 'n', long, default_value = DEFAULT_OUTPUT_NAME, value_name = "NAME")]
    pub name: String,

    /// Largest file size read fully into memory (e.g., 200M, 1G)
    #[arg(long, default_value = "200M", value_name = "SIZE")]
    pub full_load_limit: String,

    /// Number of worker threads (0 = auto-detect)
    #[arg(short = 't', long, default_value = "0", value_name = "NUM")]
    pub threads: usize,

    /// Also hash this program's own file if it lies in the source tree
    #[arg(long)]
    pub no_ignore_self: bool,

    /// Relative path pattern to exclude (glob, repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories
    #[arg(long)]
    pub skip_hidden: bool,

    /// Show a progress bar
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress the summary)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Output format for the run report
    #[arg(long, value_enum, default_value = "text")]
    pub report_format: ReportFormat,

    /// Wait for Enter before exiting
    #[arg(long)]
    pub pause: bool,

    /// Emit log records as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Re-hash the files listed in a manifest and report mismatches
    #[command(name = "verify")]
    Verify {
        /// Manifest file path
        manifest: PathBuf,
        /// Directory the manifest paths are relative to
        /// (default: parent of the manifest's directory)
        #[arg(short, long, value_name = "DIR")]
        source: Option<PathBuf>,
        /// Number of worker threads (0 = auto-detect)
        #[arg(short, long, default_value = "0")]
        threads: usize,
        /// Print every file, not only failures
        #[arg(long)]
        all: bool,
    },
}

/// Output format for the run report
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Source directory
    pub source: PathBuf,
    /// Directory receiving the manifest
    pub output_dir: PathBuf,
    /// Manifest file name
    pub output_name: String,
    /// Files at or below this size are fully buffered, larger ones mapped
    pub full_load_threshold: u64,
    /// Worker count (0 = auto-detect)
    pub threads: usize,
    /// File name excluded from the task list (the tool itself)
    pub exclude_name: Option<OsString>,
    /// Exclude patterns
    pub exclude_patterns: Vec<String>,
    /// Follow symlinks
    pub follow_symlinks: bool,
    /// Include hidden files
    pub include_hidden: bool,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            full_load_threshold: DEFAULT_FULL_LOAD_LIMIT,
            threads: 0, // Auto-detect
            exclude_name: None,
            exclude_patterns: Vec::new(),
            follow_symlinks: false,
            include_hidden: true,
        }
    }
}

impl ManifestConfig {
    /// Create config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> std::result::Result<Self, String> {
        let full_load_threshold = parse_size(&args.full_load_limit)
            .map_err(|e| format!("Invalid full load limit: {}", e))?;

        let exclude_name = if args.no_ignore_self {
            None
        } else {
            self_file_name()
        };

        Ok(Self {
            source: args.source.clone(),
            output_dir: args.output_dir.clone(),
            output_name: args.name.clone(),
            full_load_threshold,
            threads: args.threads,
            exclude_name,
            exclude_patterns: args.exclude.clone(),
            follow_symlinks: args.follow_symlinks,
            include_hidden: !args.skip_hidden,
        })
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.full_load_threshold > usize::MAX as u64 {
            return Err(ManifestError::config(format!(
                "full load limit {} does not fit in memory on this platform",
                self.full_load_threshold
            )));
        }
        if self.threads > MAX_WORKERS {
            return Err(ManifestError::config(format!(
                "threads must be at most {}, got {}",
                MAX_WORKERS, self.threads
            )));
        }
        if self.output_name.is_empty() {
            return Err(ManifestError::config("output name must not be empty"));
        }
        if self.output_name.contains(['/', '\\']) {
            return Err(ManifestError::config(format!(
                "output name '{}' must be a plain file name",
                self.output_name
            )));
        }
        Ok(())
    }

    /// Worker count with auto-detection applied
    pub fn effective_threads(&self) -> usize {
        resolve_threads(self.threads)
    }

    /// Manifest path as configured (not yet resolved)
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }
}

/// Map a requested worker count to a usable one (0 = hardware concurrency)
pub fn resolve_threads(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get().max(1)
    } else {
        requested
    }
}

/// File name of the running executable
pub fn self_file_name() -> Option<OsString> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|name| name.to_os_string()))
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("TB") || size.ends_with('T') {
        (size.trim_end_matches(['T', 'B']), 1024u64 * 1024 * 1024 * 1024)
    } else if size.ends_with("GB") || size.ends_with('G') {
        (size.trim_end_matches(['G', 'B']), 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        (size.trim_end_matches(['M', 'B']), 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        (size.trim_end_matches(['K', 'B']), 1024u64)
    } else if size.ends_with('B') {
        (size.trim_end_matches('B'), 1u64)
    } else {
        // Plain byte count
        (size.as_str(), 1u64)
    };

    let num_str = num_str.trim();
    if let Ok(whole) = num_str.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| format!("Size too large: {}", size));
    }

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;
    if !num.is_finite() || num < 0.0 {
        return Err(format!("Invalid number: {}", num_str));
    }

    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("200M").unwrap(), DEFAULT_FULL_LOAD_LIMIT);
        assert_eq!(parse_size("1G").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("1.5G").unwrap(), (1.5 * 1024.0 * 1024.0 * 1024.0) as u64);
        assert_eq!(parse_size("0").unwrap(), 0);
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("-1M").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ManifestConfig::default();
        assert_eq!(config.full_load_threshold, 200 * 1024 * 1024);
        assert_eq!(config.output_path(), PathBuf::from("xxHash/CRC.xxhash3"));
        assert!(config.effective_threads() >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ManifestConfig {
            threads: MAX_WORKERS + 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ManifestError::ConfigError(_))));

        let config = ManifestConfig {
            output_name: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ManifestConfig {
            output_name: "sub/CRC.xxhash3".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_cli() {
        let args = CliArgs::parse_from([
            "xxmanifest",
            "-s",
            "/data",
            "--full-load-limit",
            "1M",
            "-t",
            "2",
            "--no-ignore-self",
            "--exclude",
            "*.tmp",
        ]);
        let config = ManifestConfig::from_cli(&args).unwrap();
        assert_eq!(config.source, PathBuf::from("/data"));
        assert_eq!(config.full_load_threshold, 1024 * 1024);
        assert_eq!(config.threads, 2);
        assert!(config.exclude_name.is_none());
        assert_eq!(config.exclude_patterns, vec!["*.tmp".to_string()]);
        assert!(config.include_hidden);
    }

    #[test]
    fn test_verify_subcommand() {
        let args = CliArgs::parse_from(["xxmanifest", "verify", "out/CRC.xxhash3", "-t", "4"]);
        match args.command {
            Some(Commands::Verify { manifest, source, threads, all }) => {
                assert_eq!(manifest, PathBuf::from("out/CRC.xxhash3"));
                assert!(source.is_none());
                assert_eq!(threads, 4);
                assert!(!all);
            }
            None => panic!("expected verify subcommand"),
        }
    }
}
