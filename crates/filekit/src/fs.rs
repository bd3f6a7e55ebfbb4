//! Filesystem capability set used by the reconciler
//!
//! The reconciler never touches `std::fs` directly; it goes through
//! [`FileSystem`] so hosts can substitute their own backend.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Mode used for files and directories the reconciler creates (before umask)
pub const PERMISSIVE_MODE: u32 = 0o777;

/// Result of a successful stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Whether the path is a directory
    pub is_dir: bool,
    /// Size in bytes
    pub len: u64,
}

/// Filesystem operations needed to reconcile a single file.
pub trait FileSystem: Send + Sync {
    /// Inspect a path. A missing path is an `io::ErrorKind::NotFound` error.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Read the full byte content of a file.
    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace the full content of a file, creating it with `mode` if missing.
    fn write_all(&self, path: &Path, bytes: &[u8], mode: u32) -> io::Result<()>;

    /// Create a directory and all missing ancestors with `mode`.
    fn make_dirs_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Delete a file.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// [`FileSystem`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = fs::metadata(path)?;
        Ok(FileStat {
            is_dir: meta.is_dir(),
            len: meta.len(),
        })
    }

    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_all(&self, path: &Path, bytes: &[u8], mode: u32) -> io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        let mut file = options.open(path)?;
        file.write_all(bytes)?;
        file.flush()
    }

    fn make_dirs_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        builder.create(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}
