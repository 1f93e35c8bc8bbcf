//! Orgward — organisational directory management CLI.
//!
//! # Usage
//!
//! ```text
//! orgward org apply (--dir <dir> | --file <file>) [--dry-run]
//! orgward org dump --org-name <name> [--dir <dir>]
//! orgward org merge --dir <dir>
//! orgward repos dump --org-name <name>
//! orgward repos update-admin-topics --org-name <name> [--dry-run]
//! orgward repos update-teams --org-name <name> [--add-read-teams ...]
//!     [--remove-read-teams ...] [--exclude ...] [--only ...] [--dry-run]
//! orgward version
//! ```
//!
//! `--format yaml|json|quiet` and `--debug` apply to every command.

mod commands;
mod platform;
mod printer;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{org::OrgCommand, repos::ReposCommand};
use printer::OutputFormat;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "orgward",
    version,
    about = "Manage the declared state of an organisational directory",
    long_about = None,
)]
struct Cli {
    /// Output format for command results.
    #[arg(long, global = true, default_value = "yaml")]
    format: OutputFormat,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Organisation and team commands.
    Org {
        #[command(subcommand)]
        command: OrgCommand,
    },

    /// Repository commands.
    Repos {
        #[command(subcommand)]
        command: ReposCommand,
    },

    /// Print build metadata.
    Version,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Commands::Org { command } => commands::org::run(command, cli.format).await,
        Commands::Repos { command } => commands::repos::run(command, cli.format).await,
        Commands::Version => commands::version::run(cli.format),
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
