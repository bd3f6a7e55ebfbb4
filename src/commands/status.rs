use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use filekit::{FileReconciler, FileStatus};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{load_manifest, load_state, selected};
use crate::Context;
use crate::config::Manifest;
use crate::state::LocalFileState;
use crate::ui;

/// One row of `localfile status`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusEntry {
    pub name: String,
    pub path: PathBuf,
    pub status: FileStatus,
    /// Recorded in state with a non-empty identity that still verifies
    pub tracked: bool,
    /// Recorded in state but no longer in the manifest
    pub orphaned: bool,
}

pub fn run(ctx: &Context, target: Option<&str>, json: bool) -> Result<()> {
    let loaded = load_manifest(ctx)?;
    let state = load_state(ctx)?.snapshot();

    let entries = collect(
        &FileReconciler::new(),
        &loaded.manifest,
        &loaded.base_dir,
        &state,
        target,
    )?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialize status")?
        );
        return Ok(());
    }

    ui::header("Declared Files");
    if entries.is_empty() {
        ui::dim("Nothing declared");
        return Ok(());
    }

    for entry in &entries {
        let label = match (entry.status, entry.tracked, entry.orphaned) {
            (_, _, true) => "orphaned".red(),
            (FileStatus::Matching, true, _) => "present".green(),
            (FileStatus::Matching, false, _) => "untracked".cyan(),
            (FileStatus::Drifted, _, _) => "drifted".yellow(),
            (FileStatus::Absent, _, _) => "absent".red(),
        };
        println!(
            "  {:<10} {:<20} {}",
            label,
            entry.name,
            entry.path.display().to_string().dimmed()
        );
    }

    let converged = entries.iter().filter(|e| e.tracked).count();
    println!();
    ui::kv("Manifest", &ctx.manifest.display().to_string());
    ui::kv("State", &ctx.state_path.display().to_string());
    ui::kv(
        "Converged",
        &format!("{}/{}", converged, loaded.manifest.files.len()),
    );
    if converged < entries.len() {
        ui::dim("Run: localfile apply");
    }

    Ok(())
}

/// Refresh every selected declaration against the filesystem.
///
/// Verify against the prior identity first; only an empty result needs a
/// full check to tell a drifted file from a missing one.
pub fn collect(
    reconciler: &FileReconciler,
    manifest: &Manifest,
    base_dir: &Path,
    state: &LocalFileState,
    target: Option<&str>,
) -> Result<Vec<StatusEntry>> {
    let mut entries = Vec::new();

    for decl in manifest.files.iter().filter(|d| selected(target, &d.name)) {
        let desired = decl.desired_state(base_dir);
        let prior = state.prior_identity(&decl.name, &desired.path);

        let id = reconciler
            .verify(&desired, &prior)
            .with_context(|| format!("Failed to verify {}", decl.name))?;
        let (status, tracked) = if id.is_empty() {
            let status = reconciler
                .check(&desired)
                .with_context(|| format!("Failed to check {}", decl.name))?;
            (status, false)
        } else {
            (FileStatus::Matching, true)
        };

        entries.push(StatusEntry {
            name: decl.name.clone(),
            path: desired.path,
            status,
            tracked,
            orphaned: false,
        });
    }

    for (name, record) in &state.files {
        if manifest.find(name).is_some() || !selected(target, name) {
            continue;
        }
        let observed = reconciler
            .observe(&record.path)
            .with_context(|| format!("Failed to inspect {name}"))?;
        entries.push(StatusEntry {
            name: name.clone(),
            path: record.path.clone(),
            status: if observed.exists() {
                FileStatus::Drifted
            } else {
                FileStatus::Absent
            },
            tracked: false,
            orphaned: true,
        });
    }

    Ok(entries)
}
