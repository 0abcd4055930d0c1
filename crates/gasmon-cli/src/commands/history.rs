//! History command implementation.

use anyhow::Result;
use gasmon_sync::ServiceClient;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_history_text};

pub async fn cmd_history(
    client: &ServiceClient,
    limit: u32,
    format: OutputFormat,
    opts: &FormatOptions,
) -> Result<()> {
    let readings = client.history(limit).await?;

    match format {
        OutputFormat::Text => print!("{}", format_history_text(&readings, opts)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&readings)?),
    }
    Ok(())
}
