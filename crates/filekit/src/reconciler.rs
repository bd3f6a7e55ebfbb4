//! File reconciliation: materialize, verify, remove
//!
//! A declared file has two logical states, Present and Absent. The reconciler
//! keeps no state between calls; the caller hands back the [`Identity`] it
//! received last time.

use std::io;
use std::path::Path;

use crate::error::{Error, Result};
use crate::fs::{FileSystem, OsFileSystem, PERMISSIVE_MODE};
use crate::types::{DesiredState, FileStatus, Identity, ObservedState};

/// Reconciles a declared file against a [`FileSystem`].
#[derive(Debug, Clone, Default)]
pub struct FileReconciler<F: FileSystem = OsFileSystem> {
    fs: F,
}

impl FileReconciler<OsFileSystem> {
    /// Create a reconciler over the real filesystem.
    pub fn new() -> Self {
        Self { fs: OsFileSystem }
    }
}

impl<F: FileSystem> FileReconciler<F> {
    /// Create a reconciler over a custom filesystem backend.
    pub fn with_fs(fs: F) -> Self {
        Self { fs }
    }

    /// The filesystem backend in use.
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Read what is currently at `path`.
    ///
    /// A missing path is [`ObservedState::Absent`]. Any other stat or read
    /// failure is returned as an error.
    pub fn observe(&self, path: &Path) -> Result<ObservedState> {
        match self.fs.stat(path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::trace!("{} does not exist", path.display());
                return Ok(ObservedState::Absent);
            }
            Err(source) => {
                return Err(Error::Stat {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        match self.fs.read_all(path) {
            Ok(bytes) => Ok(ObservedState::Present(bytes)),
            // Removed between stat and read.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ObservedState::Absent),
            Err(source) => Err(Error::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Classify the declared file as absent, matching or drifted.
    pub fn check(&self, desired: &DesiredState) -> Result<FileStatus> {
        let status = match self.observe(&desired.path)? {
            ObservedState::Absent => FileStatus::Absent,
            ObservedState::Present(bytes) if bytes == desired.effective_content() => {
                FileStatus::Matching
            }
            ObservedState::Present(_) => FileStatus::Drifted,
        };
        log::debug!("{}: {}", desired.path.display(), status);
        Ok(status)
    }

    /// Detect drift without making changes.
    ///
    /// Returns `prior` unchanged when the file exists with exactly the desired
    /// bytes, and the empty identity when it is missing or differs.
    pub fn verify(&self, desired: &DesiredState, prior: &Identity) -> Result<Identity> {
        match self.check(desired)? {
            FileStatus::Matching => Ok(prior.clone()),
            FileStatus::Absent | FileStatus::Drifted => Ok(Identity::empty()),
        }
    }

    /// Write the desired content, creating missing parent directories.
    ///
    /// Serves both create and in-place update. A directory created before a
    /// failed write is left in place.
    pub fn materialize(&self, desired: &DesiredState) -> Result<Identity> {
        let content = desired.effective_content();
        let path = desired.path.as_path();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
            && self.fs.stat(parent).is_err()
        {
            log::debug!("Creating directory {}", parent.display());
            self.fs
                .make_dirs_all(parent, PERMISSIVE_MODE)
                .map_err(|source| Error::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        self.fs
            .write_all(path, content, PERMISSIVE_MODE)
            .map_err(|source| Error::Write {
                path: path.to_path_buf(),
                source,
            })?;

        log::debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(Identity::present())
    }

    /// Delete the declared file.
    ///
    /// Best effort: any failure, including the file already being gone, is
    /// swallowed. Permission errors are not distinguished from absence.
    pub fn remove(&self, desired: &DesiredState) {
        match self.fs.remove(&desired.path) {
            Ok(()) => log::debug!("Removed {}", desired.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} already absent", desired.path.display());
            }
            Err(e) => log::warn!("Could not remove {}: {}", desired.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FileStat;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn reconciler() -> FileReconciler {
        FileReconciler::new()
    }

    /// Real filesystem with injectable failures
    #[derive(Debug, Default)]
    struct Faulty {
        fail_stat: Option<io::ErrorKind>,
        fail_write: Option<io::ErrorKind>,
        fail_remove: Option<io::ErrorKind>,
        remove_calls: Mutex<usize>,
        mkdir_calls: Mutex<usize>,
    }

    impl FileSystem for Faulty {
        fn stat(&self, path: &Path) -> io::Result<FileStat> {
            match self.fail_stat {
                Some(kind) => Err(io::Error::from(kind)),
                None => OsFileSystem.stat(path),
            }
        }
        fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
            OsFileSystem.read_all(path)
        }
        fn write_all(&self, path: &Path, bytes: &[u8], mode: u32) -> io::Result<()> {
            match self.fail_write {
                Some(kind) => Err(io::Error::from(kind)),
                None => OsFileSystem.write_all(path, bytes, mode),
            }
        }
        fn make_dirs_all(&self, path: &Path, mode: u32) -> io::Result<()> {
            *self.mkdir_calls.lock().unwrap() += 1;
            OsFileSystem.make_dirs_all(path, mode)
        }
        fn remove(&self, path: &Path) -> io::Result<()> {
            *self.remove_calls.lock().unwrap() += 1;
            match self.fail_remove {
                Some(kind) => Err(io::Error::from(kind)),
                None => OsFileSystem.remove(path),
            }
        }
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("out.txt")).with_content("hello");

        let first = reconciler().materialize(&desired).unwrap();
        let bytes_after_first = fs::read(&desired.path).unwrap();
        let second = reconciler().materialize(&desired).unwrap();
        let bytes_after_second = fs::read(&desired.path).unwrap();

        assert_eq!(first, second);
        assert!(!first.is_empty());
        assert_eq!(bytes_after_first, b"hello");
        assert_eq!(bytes_after_first, bytes_after_second);
    }

    #[test]
    fn test_verify_after_materialize_reports_no_drift() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("out.txt")).with_content("hello");

        let id = reconciler().materialize(&desired).unwrap();
        let verified = reconciler().verify(&desired, &id).unwrap();

        assert_eq!(verified, id);
        assert!(!verified.is_empty());
    }

    #[test]
    fn test_verify_detects_external_change() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("out.txt")).with_content("hello");

        let id = reconciler().materialize(&desired).unwrap();
        fs::write(&desired.path, "tampered").unwrap();

        assert!(reconciler().verify(&desired, &id).unwrap().is_empty());
        assert_eq!(reconciler().check(&desired).unwrap(), FileStatus::Drifted);
    }

    #[test]
    fn test_verify_missing_file_is_empty_identity() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("never-written.txt"));

        let verified = reconciler().verify(&desired, &Identity::present()).unwrap();

        assert!(verified.is_empty());
        assert_eq!(reconciler().check(&desired).unwrap(), FileStatus::Absent);
    }

    #[test]
    fn test_verify_does_not_normalize_line_endings() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("crlf.txt")).with_content("a\nb\n");
        fs::write(&desired.path, "a\r\nb\r\n").unwrap();

        assert!(
            reconciler()
                .verify(&desired, &Identity::present())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_sensitive_content_is_written() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("out.txt"))
            .with_content("A")
            .with_sensitive_content("B");

        let id = reconciler().materialize(&desired).unwrap();

        assert_eq!(fs::read(&desired.path).unwrap(), b"B");
        assert_eq!(reconciler().verify(&desired, &id).unwrap(), id);
    }

    #[test]
    fn test_empty_content_when_neither_field_set() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("empty.txt"));

        reconciler().materialize(&desired).unwrap();

        assert_eq!(fs::read(&desired.path).unwrap(), b"");
        assert_eq!(reconciler().check(&desired).unwrap(), FileStatus::Matching);
    }

    #[test]
    fn test_materialize_creates_missing_ancestors() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let desired =
            DesiredState::new(root.join("a").join("b").join("c").join("out.txt")).with_content("x");

        reconciler().materialize(&desired).unwrap();

        assert!(root.join("a").is_dir());
        assert!(root.join("a/b").is_dir());
        assert!(root.join("a/b/c").is_dir());
        assert_eq!(fs::read(root.join("a/b/c/out.txt")).unwrap(), b"x");
    }

    #[test]
    fn test_remove_then_verify_is_absent_and_remove_again_is_noop() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("out.txt")).with_content("bye");

        let id = reconciler().materialize(&desired).unwrap();
        reconciler().remove(&desired);

        assert!(!desired.path.exists());
        assert!(reconciler().verify(&desired, &id).unwrap().is_empty());

        reconciler().remove(&desired);
        assert!(!desired.path.exists());
    }

    #[test]
    fn test_remove_swallows_permission_errors() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("locked.txt")).with_content("x");
        let reconciler = FileReconciler::with_fs(Faulty {
            fail_remove: Some(io::ErrorKind::PermissionDenied),
            ..Default::default()
        });

        reconciler.materialize(&desired).unwrap();
        reconciler.remove(&desired);

        assert_eq!(*reconciler.fs().remove_calls.lock().unwrap(), 1);
        assert!(desired.path.exists());
    }

    #[test]
    fn test_bytes_are_compared_exactly() {
        let temp = TempDir::new().unwrap();
        let payload: Vec<u8> = vec![0x00, 0xff, 0xfe, b'a', 0x00, 0xc3, 0x28];
        let desired = DesiredState::new(temp.path().join("bin.dat")).with_content(payload.clone());

        let id = reconciler().materialize(&desired).unwrap();

        assert_eq!(fs::read(&desired.path).unwrap(), payload);
        assert_eq!(reconciler().verify(&desired, &id).unwrap(), id);

        let mut altered = payload;
        altered[0] = 0x01;
        fs::write(&desired.path, &altered).unwrap();
        assert!(reconciler().verify(&desired, &id).unwrap().is_empty());
    }

    #[test]
    fn test_read_failure_is_fatal_not_drift() {
        let temp = TempDir::new().unwrap();
        // A directory at the target path stats fine but cannot be read as a file.
        let target = temp.path().join("dir-not-file");
        fs::create_dir(&target).unwrap();
        let desired = DesiredState::new(&target).with_content("x");

        let err = reconciler()
            .verify(&desired, &Identity::present())
            .unwrap_err();

        assert!(matches!(err, Error::Read { .. }));
        assert_eq!(err.path(), target.as_path());
    }

    #[test]
    fn test_failed_write_leaves_created_directory() {
        let temp = TempDir::new().unwrap();
        let parent = temp.path().join("made").join("here");
        let desired = DesiredState::new(parent.join("out.txt")).with_content("x");
        let reconciler = FileReconciler::with_fs(Faulty {
            fail_write: Some(io::ErrorKind::StorageFull),
            ..Default::default()
        });

        let err = reconciler.materialize(&desired).unwrap_err();

        assert!(matches!(err, Error::Write { .. }));
        assert!(parent.is_dir());
        assert!(!desired.path.exists());
    }

    #[test]
    fn test_directory_creation_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let desired = DesiredState::new(blocker.join("sub").join("out.txt")).with_content("x");

        let err = reconciler().materialize(&desired).unwrap_err();

        assert!(matches!(err, Error::CreateDir { .. }));
        assert_eq!(err.path(), blocker.join("sub").as_path());
    }

    #[test]
    fn test_bare_filename_needs_no_directory() {
        // Fail the write so nothing lands in the working directory.
        let reconciler = FileReconciler::with_fs(Faulty {
            fail_write: Some(io::ErrorKind::StorageFull),
            ..Default::default()
        });
        let desired = DesiredState::new("out.txt").with_content("x");

        let err = reconciler.materialize(&desired).unwrap_err();

        assert!(matches!(err, Error::Write { .. }));
        assert_eq!(*reconciler.fs().mkdir_calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_existing_parent_is_not_recreated() {
        let temp = TempDir::new().unwrap();
        let reconciler = FileReconciler::with_fs(Faulty::default());
        let desired = DesiredState::new(temp.path().join("out.txt")).with_content("x");

        reconciler.materialize(&desired).unwrap();

        assert_eq!(*reconciler.fs().mkdir_calls.lock().unwrap(), 0);
        assert_eq!(fs::read(&desired.path).unwrap(), b"x");
    }

    #[test]
    fn test_stat_failure_is_fatal_not_absence() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("out.txt")).with_content("x");
        let reconciler = FileReconciler::with_fs(Faulty {
            fail_stat: Some(io::ErrorKind::PermissionDenied),
            ..Default::default()
        });

        let err = reconciler
            .verify(&desired, &Identity::present())
            .unwrap_err();

        assert!(matches!(err, Error::Stat { .. }));
        assert_eq!(err.category(), crate::ErrorCategory::Permission);
        assert_eq!(err.path(), desired.path.as_path());
    }
}
