mod cli;
mod commands;
mod format;

use anyhow::Result;
use clap::Parser;
use gasmon_sync::ServiceClient;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::format::FormatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client = ServiceClient::new(&cli.url)?;
    let opts = FormatOptions {
        color: !cli.no_color,
        ..FormatOptions::default()
    };

    match cli.command {
        Commands::Watch(args) => commands::cmd_watch(client, args, opts).await,
        Commands::History { limit, format } => {
            commands::cmd_history(&client, limit, format, &opts).await
        }
        Commands::Send(args) => commands::cmd_send(&client, args, &opts).await,
    }
}
