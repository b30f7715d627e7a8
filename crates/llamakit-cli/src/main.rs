//! llamakit CLI - inspect and install llama.cpp server backends

mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use llamakit_core::config::BackendConfig;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt().with_env_filter("warn").init();
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command_async(cli))
}

async fn run_command_async(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Doctor => commands::doctor::run(),
        Commands::List { json } => commands::list::run(resolve_config(cli.data_dir)?, json).await,
        Commands::Install { selection } => {
            commands::install::run(resolve_config(cli.data_dir)?, &selection).await
        }
        Commands::CheckUpdates { selection } => {
            commands::update::run(resolve_config(cli.data_dir)?, &selection).await
        }
        Commands::Clean { backend } => commands::clean::run(resolve_config(cli.data_dir)?, &backend),
    }
}

fn resolve_config(data_dir: Option<PathBuf>) -> anyhow::Result<BackendConfig> {
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share/llamakit"))
            .context("no --data-dir given and HOME is unset")?,
    };
    Ok(BackendConfig::new(data_dir))
}
