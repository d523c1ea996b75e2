//! Manifest writer
//!
//! One line per result on a single buffered stream:
//!
//! ```text
//! <16 hex digits> *..\<relative/posix/path>
//! [ERROR] <path>: <message>
//! ```
//!
//! The `*` marks binary mode for checksum tools and the `..\` prefix is
//! what existing verifiers expect; both are kept byte for byte.

use crate::error::{IoResultExt, ManifestError, Result};
use crate::fs::to_posix;
use crate::hash::{format_digest, HashResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Literal marker placed between the digest and the relative path
pub const PATH_MARKER: &str = " *..\\";

/// Prefix of error lines
pub const ERROR_PREFIX: &str = "[ERROR] ";

const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Render one manifest line, newline included
pub fn format_line(result: &HashResult) -> String {
    match result {
        HashResult::Ok {
            relative_path,
            digest,
            ..
        } => format!(
            "{}{}{}\n",
            format_digest(*digest),
            PATH_MARKER,
            to_posix(relative_path)
        ),
        HashResult::Err { path, message } => {
            format!("{}{}: {}\n", ERROR_PREFIX, path.display(), message)
        }
    }
}

/// Sequential writer for manifest lines
pub struct ManifestWriter<W: Write> {
    inner: BufWriter<W>,
    /// Path used in error messages
    path: PathBuf,
    lines_written: u64,
}

impl ManifestWriter<File> {
    /// Create (or truncate) the manifest file at `path`
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_output_path(path)?;
        Ok(Self::with_path(file, path))
    }
}

impl<W: Write> ManifestWriter<W> {
    /// Wrap an arbitrary writer
    pub fn new(inner: W) -> Self {
        Self::with_path(inner, Path::new("<stream>"))
    }

    fn with_path(inner: W, path: &Path) -> Self {
        Self {
            inner: BufWriter::with_capacity(WRITE_BUFFER_SIZE, inner),
            path: path.to_path_buf(),
            lines_written: 0,
        }
    }

    /// Append the line for one result
    pub fn write(&mut self, result: &HashResult) -> Result<()> {
        self.inner
            .write_all(format_line(result).as_bytes())
            .with_output_path(&self.path)?;
        self.lines_written += 1;
        Ok(())
    }

    /// Number of lines written so far
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Flush buffered lines without closing
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().with_output_path(&self.path)
    }

    /// Flush and hand back the underlying writer
    pub fn finish(self) -> Result<W> {
        let path = self.path;
        self.inner
            .into_inner()
            .map_err(|e| ManifestError::output(path, e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_ok_line_format() {
        let result = HashResult::Ok {
            relative_path: PathBuf::from("sub").join("b.bin"),
            digest: 0xabc,
            size: 0,
        };
        assert_eq!(format_line(&result), "0000000000000abc *..\\sub/b.bin\n");
    }

    #[test]
    fn test_error_line_format() {
        let result = HashResult::Err {
            path: PathBuf::from("/data/locked.bin"),
            message: "Permission denied (os error 13)".to_string(),
        };
        assert_eq!(
            format_line(&result),
            "[ERROR] /data/locked.bin: Permission denied (os error 13)\n"
        );
    }

    #[test]
    fn test_writer_counts_and_finishes() {
        let mut writer = ManifestWriter::new(Vec::new());
        writer
            .write(&HashResult::Ok {
                relative_path: PathBuf::from("a.txt"),
                digest: u64::MAX,
                size: 4,
            })
            .unwrap();
        assert_eq!(writer.lines_written(), 1);

        let bytes = writer.finish().unwrap();
        assert_eq!(bytes, b"ffffffffffffffff *..\\a.txt\n");
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn test_write_failure_is_output_error() {
        let mut writer = ManifestWriter::new(FailingWriter);
        // Buffered: the failure surfaces at the latest on finish
        let _ = writer.write(&HashResult::Err {
            path: PathBuf::from("/x"),
            message: "gone".to_string(),
        });
        match writer.finish() {
            Err(ManifestError::OutputIo { .. }) => {}
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ManifestWriter::create(&dir.path().join("no/such/dir/CRC.xxhash3"));
        assert!(matches!(err, Err(ManifestError::OutputIo { .. })));
    }
}
