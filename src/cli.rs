use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::MANIFEST_FILE;

#[derive(Parser)]
#[command(name = "localfile")]
#[command(version)]
#[command(about = "Declare files, detect drift, converge", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest declaring the files to manage
    #[arg(
        short = 'f',
        long,
        global = true,
        env = "LOCALFILE_MANIFEST",
        default_value = MANIFEST_FILE
    )]
    pub manifest: PathBuf,

    /// State file [default: .localfile/state.toml next to the manifest]
    #[arg(long, global = true, env = "LOCALFILE_STATE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show whether each declared file is present, drifted or absent
    Status(StatusArgs),

    /// Preview what apply would change
    Plan(TargetArgs),

    /// Make the filesystem match the manifest
    Apply(ApplyArgs),

    /// Remove every managed file
    Destroy(DestroyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Only this file ("name" or "local_file.name")
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of files to write in parallel
    #[arg(short, long, default_value_t = 4)]
    pub jobs: u16,
}

#[derive(Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
