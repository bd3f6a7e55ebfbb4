//! Execution engine - localfile-specific executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, ConfirmCallback, ExecuteOptions, ExecuteSummary, ExecutionPlan, ProgressCallback,
    ResourceDiff, compute_diffs,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};

use super::differ::write_diff;

/// Progress bar per batch
pub struct BarProgress {
    bar: Option<ProgressBar>,
    hidden: bool,
}

impl BarProgress {
    pub fn new(hidden: bool) -> Self {
        Self { bar: None, hidden }
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize, removals: bool) {
        let bar = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(count as u64)
        };
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_prefix(if removals { "Removing" } else { "Applying" });
        self.bar = Some(bar);
    }

    fn on_resource_start(&mut self, id: &str, _description: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(id.to_string());
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{} {}", result.symbol(), id));
            bar.inc(1);
        }
        if let ApplyResult::Failed { error } = result {
            log::error!("{id}: {error}");
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Interactive confirmation, skipped with `--yes`
pub struct PromptConfirm {
    pub yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }

        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

/// Terminal report of a run; writes nothing when quiet
pub struct Report<W: Write> {
    out: W,
    quiet: bool,
}

impl<W: Write> Report<W> {
    pub fn new(out: W, quiet: bool) -> Self {
        Self { out, quiet }
    }

    fn diff(&mut self, diffs: &[ResourceDiff]) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        write_diff(&mut self.out, diffs)
    }

    fn dry_run(&mut self) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(self.out)?;
        writeln!(self.out, "  {} Dry run - no changes made", "ℹ".blue())
    }

    fn summary(&mut self, summary: &ExecuteSummary) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let out = &mut self.out;
        writeln!(out)?;
        if summary.total() == summary.skipped && summary.skipped > 0 {
            return writeln!(out, "  {} Aborted", "✗".red());
        }

        if summary.is_success() {
            writeln!(out, "  {} Files converged successfully!", "✓".green().bold())?;
        } else {
            writeln!(out, "  {} Converged with errors", "⚠".yellow().bold())?;
        }

        if summary.created > 0 {
            writeln!(out, "    • {} files created", summary.created)?;
        }
        if summary.modified > 0 {
            writeln!(out, "    • {} files replaced", summary.modified)?;
        }
        if summary.removed > 0 {
            writeln!(out, "    • {} files removed", summary.removed)?;
        }
        if summary.skipped > 0 {
            writeln!(out, "    • {} files skipped", summary.skipped)?;
        }
        for (id, error) in &summary.failures {
            writeln!(out, "    • {} {}: {}", "failed".red(), id, error)?;
        }
        Ok(())
    }
}

/// Show the diff, then execute the plan with localfile's UI
pub fn execute(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    yes: bool,
    quiet: bool,
) -> Result<ExecuteSummary> {
    execute_with(plan, opts, yes, &mut Report::new(io::stdout(), quiet))
}

fn execute_with<W: Write>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    yes: bool,
    report: &mut Report<W>,
) -> Result<ExecuteSummary> {
    let mut diffs = compute_diffs(&plan.removals)?;
    diffs.extend(compute_diffs(&plan.applies)?);

    report.diff(&diffs)?;

    if diffs.is_empty() {
        return Ok(ExecuteSummary::default());
    }

    if opts.dry_run {
        report.dry_run()?;
        return Ok(ExecuteSummary::default());
    }

    let summary = declarative::execute(
        plan,
        opts,
        &mut BarProgress::new(report.quiet),
        &mut PromptConfirm { yes },
    )?;

    report.summary(&summary)?;
    Ok(summary)
}
