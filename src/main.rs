use std::env;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::error;

mod archive;
mod changelog;
mod cli;
mod commands;
mod config;
mod error;
mod exec;
mod logging;
mod platform;
mod prompt;
mod staging;
mod vcs;

fn main() -> ExitCode {
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose);

    match pack(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn pack(args: &cli::Cli) -> Result<()> {
    let cwd = env::current_dir().context("could not determine the current directory")?;
    let source_root = dunce::canonicalize(&cwd)
        .with_context(|| format!("could not canonicalize {}", cwd.display()))?;

    let executor = exec::SystemExecutor;
    let mut prompter = prompt::StdinPrompter;
    commands::pack::run(args, &source_root, &executor, &mut prompter)?;
    Ok(())
}
