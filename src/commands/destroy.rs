use anyhow::{Result, bail};
use declarative::ExecuteOptions;

use super::{load_state, save_state};
use crate::Context;
use crate::engine;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>, yes: bool) -> Result<()> {
    let state = load_state(ctx)?;

    let plan = engine::destroy_plan(&state).filter_by_target(target);
    if plan.is_empty() {
        ui::info("No managed files recorded");
        return Ok(());
    }

    let summary = engine::execute(plan, ExecuteOptions::default(), yes, ctx.quiet)?;

    if summary.total() > summary.skipped {
        save_state(ctx, &state)?;
    }

    if !summary.is_success() {
        bail!("{} file(s) could not be removed", summary.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LocalFileState;
    use filekit::Identity;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_destroy_removes_recorded_files() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join("localfile.toml");
        let ctx = Context {
            verbose: 0,
            quiet: true,
            state_path: crate::config::default_state_path(&manifest),
            manifest,
        };

        let a = temp.path().join("a.txt");
        let b = temp.path().join("b.txt");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();
        let mut state = LocalFileState::default();
        state.record("a", &a, Identity::present());
        state.record("b", &b, Identity::present());
        state.save(&ctx.state_path).unwrap();

        run(&ctx, Some("a"), true).unwrap();
        assert!(!a.exists());
        assert!(b.exists());

        run(&ctx, None, true).unwrap();
        assert!(!b.exists());
        assert!(load_state(&ctx).unwrap().snapshot().files.is_empty());
    }

    #[test]
    fn test_destroy_with_nothing_recorded() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join("localfile.toml");
        let ctx = Context {
            verbose: 0,
            quiet: true,
            state_path: temp.path().join("state.toml"),
            manifest,
        };
        run(&ctx, None, true).unwrap();
        assert!(!ctx.state_path.exists());
    }
}
