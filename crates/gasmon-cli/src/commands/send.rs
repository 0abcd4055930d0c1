//! Send command implementation.

use anyhow::Result;
use gasmon_sync::ServiceClient;
use gasmon_types::SensorPayload;

use crate::cli::{OutputFormat, SendCommand};
use crate::format::{FormatOptions, alert_banner, format_reading_json, format_reading_line};

impl From<&SendCommand> for SensorPayload {
    fn from(args: &SendCommand) -> Self {
        SensorPayload {
            gas1: args.gas1,
            gas2: args.gas2,
            gas3: args.gas3,
            gas4: args.gas4,
            temperature: args.temperature,
            humidity: args.humidity,
            distance: args.distance,
        }
    }
}

pub async fn cmd_send(client: &ServiceClient, args: SendCommand, opts: &FormatOptions) -> Result<()> {
    let response = client.send_reading(&SensorPayload::from(&args)).await?;
    let reading = &response.data;

    match args.format {
        OutputFormat::Text => {
            println!("Stored reading {}", reading.id);
            println!("{}", format_reading_line(reading, opts));
            if let Some(banner) = alert_banner(reading, opts) {
                println!("{banner}");
            }
        }
        OutputFormat::Json => println!("{}", format_reading_json(reading)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_args() {
        let args = SendCommand {
            gas1: 410.0,
            gas2: 1.0,
            gas3: 2.0,
            gas4: 3.0,
            temperature: -2.5,
            humidity: 55.0,
            distance: 120.0,
            format: OutputFormat::Text,
        };
        let payload = SensorPayload::from(&args);
        assert_eq!(payload.gas_values(), [410.0, 1.0, 2.0, 3.0]);
        assert_eq!(payload.temperature, -2.5);
        assert_eq!(payload.distance, 120.0);
    }
}
