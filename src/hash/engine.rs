//! Digest engine
//!
//! Hashes one file with XXH3-64 (seed 0). Files at or below the full-load
//! threshold are read into a buffer and hashed in one shot; larger files are
//! memory-mapped and streamed through the incremental hasher. Both paths
//! produce the same digest for the same bytes.

use crate::error::{IoResultExt, Result};
use crate::fs::FileTask;
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::{xxh3_64, Xxh3};

/// Slice size fed to the streaming hasher from a mapping
const MMAP_FEED_SIZE: usize = 1024 * 1024;

/// Outcome of hashing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashResult {
    /// File hashed
    Ok {
        /// Path relative to the source root
        relative_path: PathBuf,
        /// XXH3-64 digest
        digest: u64,
        /// Bytes hashed
        size: u64,
    },
    /// File could not be read
    Err {
        /// Absolute path of the file
        path: PathBuf,
        /// Human-readable reason
        message: String,
    },
}

impl HashResult {
    /// Whether the file was hashed
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Bytes hashed, 0 for errors
    pub fn size(&self) -> u64 {
        match self {
            Self::Ok { size, .. } => *size,
            Self::Err { .. } => 0,
        }
    }

    /// Lowercase 16-digit hex digest, if any
    pub fn hex_digest(&self) -> Option<String> {
        match self {
            Self::Ok { digest, .. } => Some(format_digest(*digest)),
            Self::Err { .. } => None,
        }
    }
}

/// How a file's bytes reach the hasher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStrategy {
    /// Read everything into a buffer, hash once
    FullLoad,
    /// Map read-only, feed the mapping incrementally
    MemoryMapped,
}

impl IoStrategy {
    /// Pick the strategy for a file of `size` bytes
    pub fn select(size: u64, full_load_threshold: u64) -> Self {
        if size <= full_load_threshold {
            Self::FullLoad
        } else {
            Self::MemoryMapped
        }
    }
}

/// Format a digest the way manifests store it
pub fn format_digest(digest: u64) -> String {
    format!("{:016x}", digest)
}

/// Hash bytes held in memory
pub fn hash_bytes(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// Hash one task. Never fails: read errors come back as [`HashResult::Err`].
pub fn digest(task: &FileTask, full_load_threshold: u64) -> HashResult {
    match hash_file(&task.path, task.size, full_load_threshold) {
        Ok((digest, size)) => {
            tracing::trace!("{} {}", format_digest(digest), task.path.display());
            HashResult::Ok {
                relative_path: task.relative_path.clone(),
                digest,
                size,
            }
        }
        Err(e) => {
            tracing::warn!("{}", e);
            HashResult::Err {
                path: task.path.clone(),
                message: e.line_message(),
            }
        }
    }
}

/// Hash the file at `path`, returning `(digest, bytes_hashed)`.
///
/// `size` is the size recorded at scan time and only drives the strategy;
/// the byte count returned is what was actually read.
pub fn hash_file(path: &Path, size: u64, full_load_threshold: u64) -> Result<(u64, u64)> {
    let strategy = IoStrategy::select(size, full_load_threshold);
    tracing::debug!(?strategy, size, "hashing {}", path.display());

    let file = File::open(path).with_path(path)?;
    match strategy {
        IoStrategy::FullLoad => hash_full_load(file, path, size),
        IoStrategy::MemoryMapped => hash_mapped(&file, path),
    }
}

fn hash_full_load(mut file: File, path: &Path, size: u64) -> Result<(u64, u64)> {
    let mut buffer = Vec::with_capacity(size as usize);
    file.read_to_end(&mut buffer).with_path(path)?;
    Ok((xxh3_64(&buffer), buffer.len() as u64))
}

fn hash_mapped(file: &File, path: &Path) -> Result<(u64, u64)> {
    // SAFETY: the mapping is read-only and dropped before returning. A file
    // truncated by another process while mapped can still fault.
    let mmap = unsafe { Mmap::map(file) }.with_path(path)?;

    #[cfg(unix)]
    {
        if let Err(e) = mmap.advise(memmap2::Advice::Sequential) {
            tracing::trace!("madvise failed for {}: {}", path.display(), e);
        }
    }

    let mut hasher = Xxh3::new();
    for chunk in mmap.chunks(MMAP_FEED_SIZE) {
        hasher.update(chunk);
    }

    Ok((hasher.digest(), mmap.len() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_strategy_boundary() {
        assert_eq!(IoStrategy::select(100, 100), IoStrategy::FullLoad);
        assert_eq!(IoStrategy::select(101, 100), IoStrategy::MemoryMapped);
        assert_eq!(IoStrategy::select(0, 0), IoStrategy::FullLoad);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(hash_bytes(b"test"), 0x9ec9f7918d7dfc40);
        assert_eq!(format_digest(hash_bytes(b"test")), "9ec9f7918d7dfc40");
    }

    #[test]
    fn test_full_load_matches_memory_hash() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "a.txt", b"test");

        let (digest, size) = hash_file(&path, 4, 1024).unwrap();
        assert_eq!(digest, hash_bytes(b"test"));
        assert_eq!(size, 4);
    }

    #[test]
    fn test_mapped_and_full_load_agree() {
        let dir = TempDir::new().unwrap();
        // Spans several feed slices plus a tail
        let content = patterned(3 * MMAP_FEED_SIZE + 4321);
        let path = create_test_file(dir.path(), "big.bin", &content);
        let len = content.len() as u64;

        let (full, full_size) = hash_file(&path, len, len).unwrap();
        let (mapped, mapped_size) = hash_file(&path, len, len - 1).unwrap();

        assert_eq!(full, mapped);
        assert_eq!(full_size, mapped_size);
        assert_eq!(full, hash_bytes(&content));
    }

    #[test]
    fn test_empty_file_both_paths() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "empty.bin", b"");

        let (full, size) = hash_file(&path, 0, 0).unwrap();
        assert_eq!(size, 0);
        assert_eq!(full, hash_bytes(b""));
    }

    #[test]
    fn test_digest_converts_errors() {
        let dir = TempDir::new().unwrap();
        let task = FileTask::new(dir.path().join("gone.txt"), dir.path(), 10);

        let result = digest(&task, 1024);
        match result {
            HashResult::Err { path, message } => {
                assert_eq!(path, task.path);
                assert!(!message.is_empty());
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_digest_ok_carries_relative_path() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let path = create_test_file(dir.path(), "sub/x.bin", &patterned(100));
        let task = FileTask::new(path, dir.path(), 100);

        let result = digest(&task, 1024);
        assert!(result.is_ok());
        assert_eq!(result.size(), 100);
        assert_eq!(result.hex_digest().unwrap().len(), 16);
        if let HashResult::Ok { relative_path, .. } = result {
            assert_eq!(relative_path, PathBuf::from("sub/x.bin"));
        }
    }

    #[test]
    fn test_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let task = FileTask::new(dir.path(), dir.path(), 0);
        assert!(!digest(&task, 1024).is_ok());
    }
}
