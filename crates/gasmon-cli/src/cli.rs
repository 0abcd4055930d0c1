//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "gasmon")]
#[command(author, version, about = "CLI for gasmon gas sensor monitoring", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Base URL of the gasmon service
    #[arg(
        short,
        long,
        global = true,
        env = "GASMON_URL",
        default_value = "http://127.0.0.1:8080"
    )]
    pub url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Follow live readings (bootstrap, polling and push)
    Watch(WatchCommand),

    /// Show recent readings, newest first
    History {
        /// Number of readings (the service caps this at its maximum)
        #[arg(short = 'n', long, default_value = "50")]
        limit: u32,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Submit a reading, acting as a sensor device
    Send(SendCommand),
}

#[derive(Debug, Clone, Args)]
pub struct WatchCommand {
    /// Sync engine settings file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the base poll interval in seconds
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Tank depth in cm used for the fill level
    #[arg(long, default_value = "200")]
    pub depth: f64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct SendCommand {
    #[arg(long, default_value = "0")]
    pub gas1: f64,
    #[arg(long, default_value = "0")]
    pub gas2: f64,
    #[arg(long, default_value = "0")]
    pub gas3: f64,
    #[arg(long, default_value = "0")]
    pub gas4: f64,
    /// Temperature in °C
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub temperature: f64,
    /// Relative humidity in %
    #[arg(long, default_value = "0")]
    pub humidity: f64,
    /// Distance to the surface in cm
    #[arg(long, default_value = "0")]
    pub distance: f64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}
