mod cli;
mod commands;
mod config;
mod engine;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Manifest declaring the managed files
    pub manifest: PathBuf,
    /// Where identity tokens are persisted between runs
    pub state_path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let state_path = cli
        .state
        .clone()
        .unwrap_or_else(|| config::default_state_path(&cli.manifest));

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        manifest: cli.manifest,
        state_path,
    };

    match cli.command {
        Command::Status(args) => {
            commands::status::run(&ctx, args.target.target.as_deref(), args.json)
        }
        Command::Plan(args) => commands::plan::run(&ctx, args.target.as_deref()),
        Command::Apply(args) => commands::apply::run(
            &ctx,
            args.target.target.as_deref(),
            args.dry_run,
            args.yes,
            args.jobs as usize,
        ),
        Command::Destroy(args) => {
            commands::destroy::run(&ctx, args.target.target.as_deref(), args.yes)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "localfile", &mut io::stdout());
            Ok(())
        }
    }
}
