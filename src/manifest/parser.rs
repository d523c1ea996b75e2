//! Manifest reader
//!
//! Accepts the lines produced by the writer as well as the plainer
//! `<digest> <path>` and `<digest> *<path>` forms written by other tools.

use crate::error::{IoResultExt, ManifestError, Result};
use crate::manifest::ERROR_PREFIX;
use std::path::{Path, PathBuf};

/// One `digest -> path` record read back from a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Expected XXH3-64 digest
    pub digest: u64,
    /// Relative path with `/` separators
    pub path: String,
    /// 1-based line number in the manifest
    pub line: usize,
}

impl ManifestEntry {
    /// Location of the file under `base_dir`
    pub fn resolve(&self, base_dir: &Path) -> PathBuf {
        self.path
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(base_dir.to_path_buf(), |acc, part| acc.join(part))
    }
}

/// Parse manifest text. Blank lines and `[ERROR]` lines are skipped.
pub fn parse_manifest(text: &str) -> Result<Vec<ManifestEntry>> {
    let mut entries = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with(ERROR_PREFIX) {
            continue;
        }
        entries.push(parse_line(line, line_no)?);
    }

    Ok(entries)
}

/// Read and parse a manifest file
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).with_path(path)?;
    parse_manifest(&String::from_utf8_lossy(&bytes))
}

fn parse_line(line: &str, line_no: usize) -> Result<ManifestEntry> {
    let (hex, rest) = line
        .split_once(' ')
        .ok_or_else(|| ManifestError::parse(line_no, "expected '<digest> <path>'"))?;

    if hex.len() != 16 {
        return Err(ManifestError::parse(
            line_no,
            format!("digest '{}' is not 16 hex digits", hex),
        ));
    }
    let digest = u64::from_str_radix(hex, 16).map_err(|_| {
        ManifestError::parse(line_no, format!("digest '{}' is not hexadecimal", hex))
    })?;

    let rest = rest.strip_prefix('*').unwrap_or(rest);
    // After the marker the path is already `/`-separated and a backslash is
    // part of a file name, except on Windows where it cannot be
    let path = match rest.strip_prefix("..\\") {
        Some(posix) if cfg!(windows) => posix.replace('\\', "/"),
        Some(posix) => posix.to_string(),
        None => rest.replace('\\', "/"),
    };

    if path.is_empty() {
        return Err(ManifestError::parse(line_no, "missing path"));
    }

    Ok(ManifestEntry {
        digest,
        path,
        line: line_no,
    })
}
