//! Trackseek CLI - Command-line interface
//!
//! Resolves queries against the built-in search sources and prints the
//! resulting envelope as JSON.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use trackseek_search::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "trackseek")]
#[command(about = "Look up audio tracks on external search sources")]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Report every dispatch attempt
    #[arg(long, global = true)]
    debug: bool,

    /// Also write a full trace log into this directory
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    commands::handle_command(cli.command, cli.debug).await
}
