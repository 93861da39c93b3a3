//! patchloop CLI, the main entry point.
//!
//! Commands:
//! - `agent`      chat with the agent, once or interactively
//! - `apply`      apply a patch file to a workspace
//! - `history`    list checkpoints
//! - `diff`       show what changed between checkpoints
//! - `restore`    reset the workspace to a checkpoint
//! - `checkpoint` record a checkpoint by hand
//! - `config`     print the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "patchloop",
    about = "patchloop: a coding agent with patches and checkpoints",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Append the prompt of this `[[agent.commands]]` entry to the message
        #[arg(short, long, requires = "message")]
        command: Option<String>,

        /// Workspace root (defaults to the current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Apply a patch (`*** Begin Patch` ... `*** End Patch`) to the workspace
    Apply {
        /// Patch file, or `-` to read standard input
        patch: String,

        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Only parse and validate; write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// List recent checkpoints, newest first
    History {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,

        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Show the changes between two checkpoints (or a checkpoint and the working tree)
    Diff {
        from: String,
        to: Option<String>,

        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Reset the workspace to a checkpoint
    Restore {
        hash: String,

        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Commit the current state of the workspace as a checkpoint
    Checkpoint {
        #[arg(short, long, default_value = "Manual checkpoint")]
        message: String,

        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Agent {
            message,
            command,
            workspace,
        } => commands::agent::run(message, command, workspace).await?,
        Commands::Apply {
            patch,
            workspace,
            dry_run,
        } => commands::apply::run(&patch, workspace, dry_run).await?,
        Commands::History { limit, workspace } => {
            commands::checkpoints::history(limit, workspace).await?
        }
        Commands::Diff {
            from,
            to,
            workspace,
        } => commands::checkpoints::diff(&from, to.as_deref(), workspace).await?,
        Commands::Restore { hash, workspace } => {
            commands::checkpoints::restore(&hash, workspace).await?
        }
        Commands::Checkpoint { message, workspace } => {
            commands::checkpoints::commit(&message, workspace).await?
        }
        Commands::Config => commands::config_cmd::show().await?,
    }

    Ok(())
}
