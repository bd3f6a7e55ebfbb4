use anyhow::{Result, bail};
use declarative::ExecuteOptions;

use super::{load_manifest, load_state, save_state};
use crate::Context;
use crate::engine;

pub fn run(
    ctx: &Context,
    target: Option<&str>,
    dry_run: bool,
    yes: bool,
    jobs: usize,
) -> Result<()> {
    let loaded = load_manifest(ctx)?;
    let state = load_state(ctx)?;

    let plan = engine::apply_plan(&loaded.manifest, &loaded.base_dir, &state)
        .filter_by_target(target);

    let opts = ExecuteOptions {
        dry_run,
        jobs: jobs.max(1),
        verbose: ctx.verbose > 0,
    };

    let summary = engine::execute(plan, opts, yes, ctx.quiet)?;

    // Record what did succeed even when some files failed
    if !dry_run && summary.total() > summary.skipped {
        save_state(ctx, &state)?;
    }

    if !summary.is_success() {
        bail!("{} file(s) failed to converge", summary.failed);
    }
    Ok(())
}
