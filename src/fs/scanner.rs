//! Directory scanner with parallel metadata collection
//!
//! Walks the source tree and turns every regular file into a
//! [`FileTask`] ready for the dispatcher.

use crate::error::{ManifestError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// One file to hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Path relative to the source root
    pub relative_path: PathBuf,
    /// File size in bytes at scan time
    pub size: u64,
}

impl FileTask {
    /// Create a task; `relative_path` is derived from `source_root`
    pub fn new(path: impl Into<PathBuf>, source_root: &Path, size: u64) -> Self {
        let path = path.into();
        let relative_path = path
            .strip_prefix(source_root)
            .unwrap_or(&path)
            .to_path_buf();

        Self {
            path,
            relative_path,
            size,
        }
    }

    /// Relative path with `/` separators regardless of platform
    pub fn posix_relative_path(&self) -> String {
        to_posix(&self.relative_path)
    }
}

/// Render a path with `/` separators
pub fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Result of a directory scan
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Canonical root that was scanned
    pub root: PathBuf,
    /// Regular files, sorted by relative path
    pub files: Vec<FileTask>,
    /// Total size of all files
    pub total_size: u64,
    /// Scan duration
    pub scan_duration: std::time::Duration,
    /// Entries that could not be read during the walk
    pub errors: Vec<String>,
}

impl ScanResult {
    /// Number of files found
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Configuration for directory scanning
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Follow symbolic links
    pub follow_symlinks: bool,
    /// Include hidden files
    pub include_hidden: bool,
    /// Exclude patterns, matched against the relative path
    pub exclude_patterns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: true,
            exclude_patterns: Vec::new(),
        }
    }
}

/// Directory scanner producing hash tasks
pub struct Scanner {
    config: ScanConfig,
    exclude_matcher: GlobSet,
}

impl Scanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Result<Self> {
        let exclude_matcher = Self::build_globset(&config.exclude_patterns)?;

        Ok(Self {
            config,
            exclude_matcher,
        })
    }

    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                ManifestError::config(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ManifestError::config(format!("Failed to build glob set: {}", e)))
    }

    /// Scan a directory and return one task per regular file
    pub fn scan(&self, root: &Path) -> Result<ScanResult> {
        let start_time = std::time::Instant::now();

        if !root.exists() {
            return Err(ManifestError::NotFound(root.to_path_buf()));
        }

        let root = root
            .canonicalize()
            .map_err(|e| ManifestError::io(root, e))?;

        if !root.is_dir() {
            return Err(ManifestError::config(format!(
                "source '{}' is not a directory",
                root.display()
            )));
        }

        let include_hidden = self.config.include_hidden;
        let entries: Vec<_> = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .into_iter()
            .filter_entry(|e| include_hidden || e.depth() == 0 || !is_hidden(e))
            .collect();

        let results: Vec<_> = entries
            .into_par_iter()
            .filter_map(|entry| match entry {
                Ok(e) => self.process_entry(&e, &root),
                Err(err) => Some(Err(err.to_string())),
            })
            .collect();

        let mut files = Vec::new();
        let mut errors = Vec::new();

        for result in results {
            match result {
                Ok(task) => files.push(task),
                Err(e) => {
                    tracing::warn!("scan: {}", e);
                    errors.push(e);
                }
            }
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        let total_size = files.iter().map(|f| f.size).sum();

        tracing::debug!(
            files = files.len(),
            errors = errors.len(),
            "scanned {}",
            root.display()
        );

        Ok(ScanResult {
            root,
            files,
            total_size,
            scan_duration: start_time.elapsed(),
            errors,
        })
    }

    fn process_entry(
        &self,
        entry: &DirEntry,
        root: &Path,
    ) -> Option<std::result::Result<FileTask, String>> {
        if !entry.file_type().is_file() {
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => return Some(Err(err.to_string())),
        };

        let task = FileTask::new(entry.path(), root, metadata.len());

        if self.exclude_matcher.is_match(task.posix_relative_path()) {
            return None;
        }

        Some(Ok(task))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Drop tasks that refer to the run's own output or to the tool itself.
///
/// `output_path` must be absolute and resolved; it is compared against each
/// task's absolute path, never by name. A task reached through a symlink is
/// resolved before comparing when its scanned size equals the existing
/// output's size, since no other task can be the same file. `exclude_name`,
/// when given, removes every task whose file name equals it.
pub fn exclude_self_references(
    tasks: Vec<FileTask>,
    output_path: &Path,
    exclude_name: Option<&OsStr>,
) -> Vec<FileTask> {
    let output_len = std::fs::metadata(output_path).ok().map(|m| m.len());

    tasks
        .into_iter()
        .filter(|task| {
            if task.path == output_path {
                tracing::debug!("skipping manifest output {}", task.path.display());
                return false;
            }
            if output_len == Some(task.size) && resolves_to(&task.path, output_path) {
                tracing::debug!("skipping manifest output linked as {}", task.path.display());
                return false;
            }
            if let Some(name) = exclude_name {
                if task.path.file_name() == Some(name) {
                    tracing::debug!("skipping self file {}", task.path.display());
                    return false;
                }
            }
            true
        })
        .collect()
}

fn resolves_to(path: &Path, target: &Path) -> bool {
    path.canonicalize()
        .map(|resolved| resolved == target)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();

        File::create(dir.path().join("small.txt"))
            .unwrap()
            .write_all(b"small file")
            .unwrap();

        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        File::create(dir.path().join("subdir/nested.bin"))
            .unwrap()
            .write_all(&[7u8; 512])
            .unwrap();

        File::create(dir.path().join(".hidden"))
            .unwrap()
            .write_all(b"hidden")
            .unwrap();

        dir
    }

    #[test]
    fn test_scanner_basic() {
        let dir = create_test_dir();
        let scanner = Scanner::new(ScanConfig::default()).unwrap();

        let result = scanner.scan(dir.path()).unwrap();

        assert_eq!(result.file_count(), 3);
        assert_eq!(result.total_size, 10 + 512 + 6);
        assert!(result.errors.is_empty());
        assert!(result.files.iter().all(|f| f.path.is_absolute()));

        let names: Vec<_> = result.files.iter().map(|f| f.posix_relative_path()).collect();
        assert_eq!(names, vec![".hidden", "small.txt", "subdir/nested.bin"]);
    }

    #[test]
    fn test_scanner_skip_hidden() {
        let dir = create_test_dir();
        let config = ScanConfig {
            include_hidden: false,
            ..Default::default()
        };
        let scanner = Scanner::new(config).unwrap();

        let result = scanner.scan(dir.path()).unwrap();
        assert_eq!(result.file_count(), 2);
    }

    #[test]
    fn test_scanner_exclude_pattern() {
        let dir = create_test_dir();
        let config = ScanConfig {
            exclude_patterns: vec!["**/*.bin".to_string()],
            ..Default::default()
        };
        let scanner = Scanner::new(config).unwrap();

        let result = scanner.scan(dir.path()).unwrap();
        assert!(!result
            .files
            .iter()
            .any(|f| f.path.extension() == Some(OsStr::new("bin"))));
    }

    #[test]
    fn test_scanner_missing_root() {
        let dir = TempDir::new().unwrap();
        let scanner = Scanner::new(ScanConfig::default()).unwrap();
        let err = scanner.scan(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
    }

    #[test]
    fn test_invalid_glob() {
        let config = ScanConfig {
            exclude_patterns: vec!["[".to_string()],
            ..Default::default()
        };
        assert!(Scanner::new(config).is_err());
    }

    #[test]
    fn test_exclude_self_references() {
        let root = Path::new("/src");
        let tasks = vec![
            FileTask::new("/src/a.txt", root, 1),
            FileTask::new("/src/out/CRC.xxhash3", root, 2),
            FileTask::new("/src/other/CRC.xxhash3", root, 3),
            FileTask::new("/src/tools/xxmanifest", root, 4),
        ];

        let kept = exclude_self_references(
            tasks,
            Path::new("/src/out/CRC.xxhash3"),
            Some(OsStr::new("xxmanifest")),
        );

        let kept: Vec<_> = kept.iter().map(|t| t.posix_relative_path()).collect();
        // Same name elsewhere in the tree is still hashed
        assert_eq!(kept, vec!["a.txt", "other/CRC.xxhash3"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_exclude_output_reached_through_link() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let output = out.path().canonicalize().unwrap().join("CRC.xxhash3");
        std::fs::write(&output, b"0000000000000000 *..\\a\n").unwrap();
        std::fs::write(src.path().join("same_size.txt"), vec![b'x'; 23]).unwrap();
        std::os::unix::fs::symlink(out.path(), src.path().join("link")).unwrap();

        let scanner = Scanner::new(ScanConfig {
            follow_symlinks: true,
            ..Default::default()
        })
        .unwrap();
        let scan = scanner.scan(src.path()).unwrap();
        assert_eq!(scan.file_count(), 2);

        let kept = exclude_self_references(scan.files, &output, None);
        let kept: Vec<_> = kept.iter().map(|t| t.posix_relative_path()).collect();
        assert_eq!(kept, vec!["same_size.txt"]);
    }

    #[test]
    fn test_posix_relative_path() {
        let task = FileTask::new("/root/dir/sub/file.txt", Path::new("/root/dir"), 0);
        assert_eq!(task.relative_path, PathBuf::from("sub/file.txt"));
        assert_eq!(task.posix_relative_path(), "sub/file.txt");
    }
}
