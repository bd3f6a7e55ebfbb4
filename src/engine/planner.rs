//! Build execution plans from the manifest and recorded state

use declarative::ExecutionPlan;
use filekit::DesiredState;
use std::path::Path;

use crate::config::Manifest;
use crate::resource::LocalFile;
use crate::state::SharedState;

/// Plan that converges the filesystem to the manifest
///
/// - every declaration becomes a file to materialize, carrying its prior identity
/// - a declaration whose path changed also removes the file at the old path
/// - recorded files no longer declared are removed
pub fn apply_plan(manifest: &Manifest, base_dir: &Path, state: &SharedState) -> ExecutionPlan {
    let snapshot = state.snapshot();
    let mut plan = ExecutionPlan::new();

    for decl in &manifest.files {
        let desired = decl.desired_state(base_dir);

        if let Some(record) = snapshot.get(&decl.name)
            && record.path != desired.path
        {
            log::info!(
                "{} moved from {} to {}, replacing",
                decl.name,
                record.path.display(),
                desired.path.display()
            );
            plan.add_resource(Box::new(LocalFile::absent(
                &decl.name,
                DesiredState::new(&record.path),
                state.clone(),
            )));
        }

        let prior = snapshot.prior_identity(&decl.name, &desired.path);
        plan.add_resource(Box::new(LocalFile::present(
            &decl.name,
            desired,
            prior,
            state.clone(),
        )));
    }

    for (name, record) in &snapshot.files {
        if manifest.find(name).is_none() {
            log::info!("{name} is no longer declared, removing");
            plan.add_resource(Box::new(LocalFile::absent(
                name,
                DesiredState::new(&record.path),
                state.clone(),
            )));
        }
    }

    plan
}

/// Plan that removes every recorded file
pub fn destroy_plan(state: &SharedState) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();
    for (name, record) in &state.snapshot().files {
        plan.add_resource(Box::new(LocalFile::absent(
            name,
            DesiredState::new(&record.path),
            state.clone(),
        )));
    }
    plan
}
