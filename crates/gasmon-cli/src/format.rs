//! Output formatting for readings.

use anyhow::Result;
use gasmon_types::{DEFAULT_TANK_DEPTH_CM, EnvironmentConditions, GasStatus, LevelStatus, Reading};
use owo_colors::OwoColorize;
use time::OffsetDateTime;

/// Options controlling text output.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub color: bool,
    /// Tank depth used to derive the fill level.
    pub depth_cm: f64,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            color: true,
            depth_cm: DEFAULT_TANK_DEPTH_CM,
        }
    }
}

pub fn format_timestamp(t: OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        t.year(),
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    )
}

fn format_status(status: GasStatus, opts: &FormatOptions) -> String {
    match (status, opts.color) {
        (GasStatus::Danger, true) => status.as_str().red().bold().to_string(),
        (GasStatus::Safe, true) => status.as_str().green().to_string(),
        (_, false) => status.as_str().to_string(),
    }
}

fn format_level(level: LevelStatus, fill: f64, opts: &FormatOptions) -> String {
    let text = format!("level {:.0}% {:?}", fill, level);
    match (level, opts.color) {
        (LevelStatus::Critical, true) => text.red().to_string(),
        (LevelStatus::Warning, true) => text.yellow().to_string(),
        _ => text,
    }
}

/// One-line summary of a reading.
pub fn format_reading_line(reading: &Reading, opts: &FormatOptions) -> String {
    let channels = reading
        .gas_values()
        .iter()
        .zip(reading.statuses())
        .enumerate()
        .map(|(i, (value, status))| {
            format!("gas{} {:>6.1} {}", i + 1, value, format_status(status, opts))
        })
        .collect::<Vec<_>>()
        .join(" | ");

    let conditions = EnvironmentConditions::with_depth(reading, opts.depth_cm);
    format!(
        "{}  {}  {:.1}°C {:?}  {:.0}% {:?}  {}",
        format_timestamp(reading.created_at),
        channels,
        reading.temperature,
        conditions.temperature,
        reading.humidity,
        conditions.humidity,
        format_level(conditions.level, conditions.fill_percent, opts),
    )
}

/// Warning line naming the channels in danger, if any.
pub fn alert_banner(reading: &Reading, opts: &FormatOptions) -> Option<String> {
    if !reading.alert_flag {
        return None;
    }
    let channels = reading
        .danger_channels()
        .map(|n| format!("gas{n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let text = format!("ALERT: dangerous gas level on {channels}");
    Some(if opts.color {
        text.white().on_red().bold().to_string()
    } else {
        text
    })
}

pub fn format_reading_json(reading: &Reading) -> Result<String> {
    Ok(serde_json::to_string(reading)?)
}

/// Readings as returned by the service (newest first), one per line.
pub fn format_history_text(readings: &[Reading], opts: &FormatOptions) -> String {
    if readings.is_empty() {
        return "No readings.\n".to_string();
    }
    let mut out = String::new();
    for reading in readings {
        out.push_str(&format_reading_line(reading, opts));
        out.push('\n');
    }
    let alerts = readings.iter().filter(|r| r.alert_flag).count();
    out.push_str(&format!("{} readings, {} with alerts\n", readings.len(), alerts));
    out
}
