//! Execution engine - applies resources with parallelism, removals first

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::compute_diffs;
use crate::planner::ExecutionPlan;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::{Arc, Mutex};

/// Execute a plan with the given options and callbacks
///
/// Removals run sequentially before any apply; applies run on a pool of
/// `opts.jobs` threads. A resource whose apply returns an error is recorded
/// as failed and does not stop the others.
///
/// Nothing runs when no resource differs from its desired state, when the
/// confirmation is declined, or in dry-run mode.
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    plan.validate()?;

    let removal_diffs = compute_diffs(&plan.removals)?;
    let apply_diffs = compute_diffs(&plan.applies)?;
    let total_changes = removal_diffs.len() + apply_diffs.len();

    if total_changes == 0 {
        log::debug!("All {} resources up to date", plan.total_resources());
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        return Ok(ExecuteSummary::default());
    }

    if !confirm.confirm(&format!("Apply {total_changes} changes?"))? {
        return Ok(ExecuteSummary {
            skipped: total_changes,
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();

    if !plan.removals.is_empty() {
        progress.on_batch_start(plan.removals.len(), true);
        let results = execute_batch(&plan.removals, 1, opts.verbose, progress)?;
        for (id, result) in &results {
            summary.add_result(id, result);
        }
        progress.on_batch_complete();
    }

    if !plan.applies.is_empty() {
        progress.on_batch_start(plan.applies.len(), false);
        let results = execute_batch(&plan.applies, opts.jobs, opts.verbose, progress)?;
        for (id, result) in &results {
            summary.add_result(id, result);
        }
        progress.on_batch_complete();
    }

    Ok(summary)
}

/// Execute a batch of resources
fn execute_batch<P: ProgressCallback>(
    resources: &[Box<dyn Resource>],
    jobs: usize,
    verbose: bool,
    progress: &mut P,
) -> Result<Vec<(String, ApplyResult)>> {
    let sequential = jobs <= 1
        || resources.len() == 1
        || resources.iter().any(|r| !r.can_parallelize());

    if sequential {
        let mut results = Vec::with_capacity(resources.len());
        for resource in resources {
            let id = resource.id();
            progress.on_resource_start(&id, &resource.description());
            let result = apply_resource(resource.as_ref(), verbose);
            progress.on_resource_complete(&id, &result);
            results.push((id, result));
        }
        Ok(results)
    } else {
        execute_parallel(resources, jobs, verbose, progress)
    }
}

/// Execute resources in parallel using rayon
fn execute_parallel<P: ProgressCallback>(
    resources: &[Box<dyn Resource>],
    jobs: usize,
    verbose: bool,
    progress: &mut P,
) -> Result<Vec<(String, ApplyResult)>> {
    // The progress callback is not thread-safe; report after the pool drains.
    let results: Arc<Mutex<Vec<(String, ApplyResult)>>> = Arc::new(Mutex::new(Vec::new()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to create apply thread pool")?;

    pool.install(|| {
        resources.par_iter().for_each(|resource| {
            let result = apply_resource(resource.as_ref(), verbose);
            push_result(&results, (resource.id(), result));
        });
    });

    let results = into_results(results)?;

    for (id, result) in &results {
        progress.on_resource_complete(id, result);
    }

    Ok(results)
}

fn push_result(results: &Mutex<Vec<(String, ApplyResult)>>, entry: (String, ApplyResult)) {
    match results.lock() {
        Ok(mut locked) => locked.push(entry),
        Err(poisoned) => poisoned.into_inner().push(entry),
    }
}

fn into_results(
    results: Arc<Mutex<Vec<(String, ApplyResult)>>>,
) -> Result<Vec<(String, ApplyResult)>> {
    let mutex = Arc::try_unwrap(results)
        .map_err(|_| anyhow::anyhow!("Failed to collect apply results: shared result state"))?;

    match mutex.into_inner() {
        Ok(collected) => Ok(collected),
        Err(poisoned) => Ok(poisoned.into_inner()),
    }
}

/// Apply a single resource
fn apply_resource(resource: &dyn Resource, verbose: bool) -> ApplyResult {
    let mut ctx = ApplyContext::new(false, verbose);

    match resource.apply(&mut ctx) {
        Ok(result) => {
            log::debug!("{}: {:?}", resource.id(), result);
            result
        }
        Err(e) => {
            log::debug!("{}: failed: {:#}", resource.id(), e);
            ApplyResult::Failed {
                error: format!("{e:#}"),
            }
        }
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}
