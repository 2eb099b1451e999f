//! tasksets CLI - hypothesis-selection agents on grid-world tasks
//!
//! - Running an agent with any clustering variant and exporting its steps
//! - Listing the context partitions the hypothesis space is built from
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasksets")]
#[command(version, about = "Task-set clustering agents for grid-world tasks", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an agent through every trial of a task
    Run(Box<tasksets::cli::commands::run::RunArgs>),

    /// List every clustering of N contexts
    Enumerate(tasksets::cli::commands::enumerate::EnumerateArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => tasksets::cli::commands::run::execute(*args),
        Commands::Enumerate(args) => tasksets::cli::commands::enumerate::execute(args),
    }
}
