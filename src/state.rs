//! Persisted identity tokens for managed files
//!
//! The reconciler keeps nothing between runs; this file is where the host
//! remembers which declared files exist and at which path.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use filekit::Identity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// State of every managed file, keyed by declared name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFileState {
    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
}

/// What the host knows about one declared file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Resolved path the file was materialized at
    pub path: PathBuf,
    /// Identity token returned by the reconciler
    pub id: Identity,
    pub updated: DateTime<Utc>,
}

impl Default for LocalFileState {
    fn default() -> Self {
        Self {
            files: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

impl LocalFileState {
    /// Load state from disk, or return default if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state for {} files from {}", state.files.len(), path.display());
        Ok(state)
    }

    /// Save state to disk, creating its directory
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.last_updated = Utc::now();
        let content = toml::to_string_pretty(&*self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FileRecord> {
        self.files.get(name)
    }

    /// Prior identity for `name` at `path`; empty if untracked or tracked elsewhere
    pub fn prior_identity(&self, name: &str, path: &Path) -> Identity {
        self.files
            .get(name)
            .filter(|r| r.path == path)
            .map(|r| r.id.clone())
            .unwrap_or_default()
    }

    /// Record the identity returned for a file. An empty identity drops the record.
    pub fn record(&mut self, name: &str, path: &Path, id: Identity) {
        if id.is_empty() {
            self.forget(name, path);
            return;
        }
        self.files.insert(
            name.to_string(),
            FileRecord {
                path: path.to_path_buf(),
                id,
                updated: Utc::now(),
            },
        );
    }

    /// Drop the record for `name`, but only if it still points at `path`
    pub fn forget(&mut self, name: &str, path: &Path) {
        if self.files.get(name).is_some_and(|r| r.path == path) {
            self.files.remove(name);
        }
    }
}

/// State shared between resources applied in parallel
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<Mutex<LocalFileState>>);

impl SharedState {
    pub fn new(state: LocalFileState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    /// Lock the state, recovering from a poisoned lock
    pub fn lock(&self) -> MutexGuard<'_, LocalFileState> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> LocalFileState {
        self.lock().clone()
    }
}
