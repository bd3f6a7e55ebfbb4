//! Command implementations
//!
//! - `status` - Show each declared file as present, drifted or absent
//! - `plan` - Preview what apply would change
//! - `apply` - Converge the filesystem to the manifest
//! - `destroy` - Remove every managed file

pub mod apply;
pub mod destroy;
pub mod plan;
pub mod status;

use anyhow::{Context as AnyhowContext, Result, bail};
use std::path::PathBuf;

use crate::Context;
use crate::config::{self, Manifest};
use crate::state::{LocalFileState, SharedState};

/// Manifest plus the directory its relative paths resolve against
pub struct Loaded {
    pub manifest: Manifest,
    pub base_dir: PathBuf,
}

/// Load the manifest named on the command line
pub fn load_manifest(ctx: &Context) -> Result<Loaded> {
    if !ctx.manifest.exists() {
        bail!(
            "Manifest not found: {}\nCreate one with [[file]] entries or pass --manifest",
            ctx.manifest.display()
        );
    }
    let manifest = Manifest::load(&ctx.manifest)?;
    let base_dir = config::manifest_dir(&ctx.manifest);
    let base_dir = if base_dir.as_os_str().is_empty() {
        std::env::current_dir().context("Could not determine current directory")?
    } else {
        base_dir
    };
    manifest.validate_paths(&base_dir)?;
    Ok(Loaded { manifest, base_dir })
}

/// Load recorded state for this manifest
pub fn load_state(ctx: &Context) -> Result<SharedState> {
    Ok(SharedState::new(LocalFileState::load(&ctx.state_path)?))
}

/// Persist whatever identities the run recorded
pub fn save_state(ctx: &Context, state: &SharedState) -> Result<()> {
    state
        .lock()
        .save(&ctx.state_path)
        .with_context(|| format!("Failed to save state to {}", ctx.state_path.display()))
}

/// Whether `name` is selected by a `--target` filter
pub fn selected(target: Option<&str>, name: &str) -> bool {
    match target {
        None => true,
        Some(t) => {
            t == name
                || t.split_once('.')
                    .is_some_and(|(ty, n)| ty == "local_file" && n == name)
        }
    }
}
