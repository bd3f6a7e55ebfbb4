//! Local file resource - a declared file driven through the reconciler

use anyhow::{Context, Result};
use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
use filekit::{DesiredState, FileReconciler, FileStatus, FileSystem, Identity, OsFileSystem};
use std::fmt;

use crate::state::SharedState;
use crate::ui;

/// What the file should converge to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensure {
    /// Materialize the declared content
    Present,
    /// Remove the file (orphaned, destroyed, or left behind by a path change)
    Absent,
}

/// A single declared file
#[derive(Debug)]
pub struct LocalFile<F: FileSystem = OsFileSystem> {
    name: String,
    desired: DesiredState,
    prior: Identity,
    ensure: Ensure,
    reconciler: FileReconciler<F>,
    state: SharedState,
}

impl LocalFile {
    /// A file that should exist with the declared content
    pub fn present(name: &str, desired: DesiredState, prior: Identity, state: SharedState) -> Self {
        Self {
            name: name.to_string(),
            desired,
            prior,
            ensure: Ensure::Present,
            reconciler: FileReconciler::new(),
            state,
        }
    }

    /// A file that should be removed
    pub fn absent(name: &str, desired: DesiredState, state: SharedState) -> Self {
        Self {
            name: name.to_string(),
            desired,
            prior: Identity::empty(),
            ensure: Ensure::Absent,
            reconciler: FileReconciler::new(),
            state,
        }
    }
}

impl<F: FileSystem> LocalFile<F> {
    /// Declared content summary; sensitive content shows only its size
    fn details(&self) -> String {
        let size = ui::format_size(self.desired.effective_content().len() as u64);
        if self.desired.is_sensitive() {
            format!("{size} (sensitive)")
        } else {
            size
        }
    }

    /// Verify against the prior identity, falling back to a full check
    /// to tell a drifted file from a missing one.
    fn refresh(&self) -> Result<(Identity, FileStatus)> {
        let id = self
            .reconciler
            .verify(&self.desired, &self.prior)
            .with_context(|| format!("Failed to verify {}", self.name))?;
        if !id.is_empty() {
            return Ok((id, FileStatus::Matching));
        }
        let status = self
            .reconciler
            .check(&self.desired)
            .with_context(|| format!("Failed to check {}", self.name))?;
        Ok((id, status))
    }

    /// Remove the file. A file that survives removal stays recorded so the
    /// next run retries it.
    fn remove(&self) -> Result<ApplyResult> {
        let existed = self.reconciler.observe(&self.desired.path)?.exists();
        self.reconciler.remove(&self.desired);

        if existed && self.reconciler.observe(&self.desired.path)?.exists() {
            log::warn!(
                "{}: {} is still present after removal",
                self.name,
                self.desired.path.display()
            );
            return Ok(ApplyResult::NoChange);
        }

        self.state.lock().forget(&self.name, &self.desired.path);
        Ok(if existed {
            ApplyResult::Removed
        } else {
            ApplyResult::NoChange
        })
    }

    fn materialize(&self) -> Result<()> {
        let id = self
            .reconciler
            .materialize(&self.desired)
            .with_context(|| format!("Failed to write {}", self.name))?;
        self.state.lock().record(&self.name, &self.desired.path, id);
        Ok(())
    }
}

impl<F: FileSystem + fmt::Debug> Resource for LocalFile<F> {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        match self.ensure {
            Ensure::Present => format!("File {} ({})", self.desired.path.display(), self.details()),
            Ensure::Absent => format!("Remove {}", self.desired.path.display()),
        }
    }

    fn resource_type(&self) -> &'static str {
        "local_file"
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.ensure == Ensure::Absent {
            let observed = self
                .reconciler
                .observe(&self.desired.path)
                .with_context(|| format!("Failed to inspect {}", self.name))?;
            return Ok(if observed.exists() {
                ResourceState::Present {
                    details: Some(self.desired.path.display().to_string()),
                }
            } else {
                ResourceState::Absent
            });
        }

        match self.refresh()? {
            (id, _) if !id.is_empty() => Ok(self.desired_state()),
            (_, FileStatus::Absent) => Ok(ResourceState::Absent),
            (_, FileStatus::Drifted) => Ok(ResourceState::Modified {
                from: "drifted".to_string(),
                to: self.details(),
            }),
            // Right bytes on disk, but not tracked yet
            (_, FileStatus::Matching) => Ok(ResourceState::Modified {
                from: "untracked".to_string(),
                to: self.details(),
            }),
        }
    }

    fn desired_state(&self) -> ResourceState {
        match self.ensure {
            Ensure::Present => ResourceState::Present {
                details: Some(self.details()),
            },
            Ensure::Absent => ResourceState::Absent,
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        if self.ensure == Ensure::Absent {
            return self.remove();
        }

        let (id, status) = self.refresh()?;
        if !id.is_empty() {
            self.state.lock().record(&self.name, &self.desired.path, id);
            return Ok(ApplyResult::NoChange);
        }

        self.materialize()?;
        Ok(match status {
            FileStatus::Absent => ApplyResult::Created,
            FileStatus::Drifted | FileStatus::Matching => ApplyResult::Modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LocalFileState;
    use filekit::FileStat;
    use std::fs;
    use std::io;
    use std::path::Path;
    use tempfile::TempDir;

    fn ctx() -> ApplyContext {
        ApplyContext::new(false, false)
    }

    #[test]
    fn test_apply_creates_and_records_identity() {
        let temp = TempDir::new().unwrap();
        let state = SharedState::default();
        let desired = DesiredState::new(temp.path().join("sub/motd.txt")).with_content("hi");
        let file = LocalFile::present("motd", desired.clone(), Identity::empty(), state.clone());

        assert_eq!(file.current_state().unwrap(), ResourceState::Absent);
        assert_eq!(file.apply(&mut ctx()).unwrap(), ApplyResult::Created);

        assert_eq!(fs::read(&desired.path).unwrap(), b"hi");
        let record = state.snapshot().get("motd").cloned().unwrap();
        assert_eq!(record.id, Identity::present());
        assert_eq!(record.path, desired.path);
    }

    #[test]
    fn test_matching_tracked_file_needs_nothing() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("motd.txt")).with_content("hi");
        fs::write(&desired.path, "hi").unwrap();
        let file = LocalFile::present("motd", desired, Identity::present(), SharedState::default());

        assert!(!file.needs_apply().unwrap());
        assert_eq!(file.apply(&mut ctx()).unwrap(), ApplyResult::NoChange);
    }

    #[test]
    fn test_drifted_file_is_rewritten() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("motd.txt")).with_content("hi");
        fs::write(&desired.path, "tampered").unwrap();
        let file = LocalFile::present(
            "motd",
            desired.clone(),
            Identity::present(),
            SharedState::default(),
        );

        assert!(matches!(
            file.current_state().unwrap(),
            ResourceState::Modified { ref from, .. } if from == "drifted"
        ));
        assert_eq!(file.apply(&mut ctx()).unwrap(), ApplyResult::Modified);
        assert_eq!(fs::read(&desired.path).unwrap(), b"hi");
    }

    #[test]
    fn test_untracked_matching_file_is_adopted() {
        let temp = TempDir::new().unwrap();
        let state = SharedState::default();
        let desired = DesiredState::new(temp.path().join("motd.txt")).with_content("hi");
        fs::write(&desired.path, "hi").unwrap();
        let file = LocalFile::present("motd", desired, Identity::empty(), state.clone());

        assert!(file.needs_apply().unwrap());
        assert_eq!(file.apply(&mut ctx()).unwrap(), ApplyResult::Modified);
        assert!(state.snapshot().get("motd").is_some());
    }

    #[test]
    fn test_absent_removes_and_forgets() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("old.txt");
        fs::write(&path, "x").unwrap();
        let mut initial = LocalFileState::default();
        initial.record("motd", &path, Identity::present());
        let state = SharedState::new(initial);

        let file = LocalFile::absent("motd", DesiredState::new(&path), state.clone());
        assert!(file.needs_apply().unwrap());
        assert_eq!(file.apply(&mut ctx()).unwrap(), ApplyResult::Removed);
        assert!(!path.exists());
        assert!(state.snapshot().get("motd").is_none());

        // Already gone: still fine
        assert_eq!(file.apply(&mut ctx()).unwrap(), ApplyResult::NoChange);
    }

    /// Real filesystem where deletes are refused
    #[derive(Debug)]
    struct Undeletable;

    impl FileSystem for Undeletable {
        fn stat(&self, path: &Path) -> io::Result<FileStat> {
            OsFileSystem.stat(path)
        }
        fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
            OsFileSystem.read_all(path)
        }
        fn write_all(&self, path: &Path, bytes: &[u8], mode: u32) -> io::Result<()> {
            OsFileSystem.write_all(path, bytes, mode)
        }
        fn make_dirs_all(&self, path: &Path, mode: u32) -> io::Result<()> {
            OsFileSystem.make_dirs_all(path, mode)
        }
        fn remove(&self, _path: &Path) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }
    }

    #[test]
    fn test_file_surviving_removal_stays_recorded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("locked.txt");
        fs::write(&path, "x").unwrap();
        let mut initial = LocalFileState::default();
        initial.record("locked", &path, Identity::present());
        let state = SharedState::new(initial);

        let file = LocalFile {
            name: "locked".to_string(),
            desired: DesiredState::new(&path),
            prior: Identity::empty(),
            ensure: Ensure::Absent,
            reconciler: FileReconciler::with_fs(Undeletable),
            state: state.clone(),
        };

        assert_eq!(file.apply(&mut ctx()).unwrap(), ApplyResult::NoChange);
        assert!(path.exists());
        assert!(state.snapshot().get("locked").is_some());
        assert!(file.needs_apply().unwrap());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let desired = DesiredState::new(temp.path().join("motd.txt")).with_content("hi");
        let file = LocalFile::present("motd", desired.clone(), Identity::empty(), SharedState::default());

        let result = file.apply(&mut ApplyContext::new(true, false)).unwrap();

        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert!(!desired.path.exists());
    }

    #[test]
    fn test_sensitive_description_hides_content() {
        let desired = DesiredState::new("/tmp/token").with_sensitive_content("s3cr3t");
        let file = LocalFile::present("token", desired, Identity::empty(), SharedState::default());

        let description = file.description();
        assert!(description.contains("(sensitive)"));
        assert!(!description.contains("s3cr3t"));
    }
}
