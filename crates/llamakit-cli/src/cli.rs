use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "llamakit")]
#[command(about = "Inspect and install llama.cpp server backends", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Application data directory holding the llamacpp/ tree
    #[arg(long, env = "LLAMAKIT_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show what this machine can run: OS, CPU extensions, GPUs, and the
    /// supported backend set
    Doctor,

    /// List available and installed backends
    List {
        /// Print the inventory as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download and install a backend build
    Install {
        /// Selection in "version/backend" form,
        /// e.g. b7524/linux-cuda-12-common_cpus-x64
        selection: String,
    },

    /// Check whether a newer build of an installed backend exists
    CheckUpdates {
        /// Current selection in "version/backend" form
        selection: String,
    },

    /// Remove installed versions of a backend type older than the latest
    Clean {
        /// Backend type to clean up, e.g. linux-common_cpus-x64
        backend: String,
    },
}
