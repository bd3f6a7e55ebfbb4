use anyhow::Result;
use declarative::compute_diffs;
use std::io;

use super::{load_manifest, load_state};
use crate::Context;
use crate::engine;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let loaded = load_manifest(ctx)?;
    let state = load_state(ctx)?;

    let plan = engine::apply_plan(&loaded.manifest, &loaded.base_dir, &state)
        .filter_by_target(target);
    plan.validate()?;

    let mut diffs = compute_diffs(&plan.removals)?;
    diffs.extend(compute_diffs(&plan.applies)?);
    engine::write_diff(&mut io::stdout(), &diffs)?;

    if !diffs.is_empty() && !ctx.quiet {
        println!();
        println!("  Run: localfile apply");
    }
    Ok(())
}
