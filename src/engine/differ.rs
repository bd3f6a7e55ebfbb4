//! Diff display

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceState};
use std::io::{self, Write};

/// Symbol and state text for one diff line
fn describe(diff: &ResourceDiff) -> (colored::ColoredString, String) {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { details }) => (
            "+".green(),
            format!(
                "(missing){}",
                details
                    .as_ref()
                    .map(|d| format!(" → {d}"))
                    .unwrap_or_default()
            ),
        ),
        (_, ResourceState::Absent) => ("-".red(), "(will remove)".to_string()),
        (ResourceState::Modified { from, to }, _) => ("~".yellow(), format!("({from}) → {to}")),
        _ => ("?".dimmed(), String::new()),
    }
}

/// Write a list of diffs in a user-friendly format
pub fn write_diff(out: &mut impl Write, diffs: &[ResourceDiff]) -> io::Result<()> {
    if diffs.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {} No changes needed", "✓".green())?;
        return Ok(());
    }

    writeln!(out)?;
    writeln!(
        out,
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    )?;
    writeln!(out, "│")?;

    for diff in diffs {
        let (symbol, state_desc) = describe(diff);
        writeln!(
            out,
            "│   {} {:<24} {}",
            symbol,
            diff.resource_id,
            state_desc.dimmed()
        )?;
        writeln!(out, "│       {}", diff.description.dimmed())?;
    }
    writeln!(out, "│")?;

    let summary = DiffSummary::from_diffs(diffs);
    writeln!(out, "├─────────────────────────────────────────────────────┤")?;
    writeln!(
        out,
        "│ Summary: {} to create, {} to replace, {} to remove",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    )?;
    writeln!(out, "└─────────────────────────────────────────────────────┘")
}
