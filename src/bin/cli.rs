//! Vcplink CLI - Command-line interface
//!
//! Reads the current telemetry values from a connected sensor and prints
//! them, for quick checks and scripting.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vcplink::{list_ports, Device, DeviceConfig, TelemetryError};

/// Vcplink CLI
#[derive(Parser, Debug)]
#[command(
    name = "vcplink",
    version,
    about = "Telemetry reader for VCP atmospheric sensors",
    long_about = None
)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    ListPorts,

    /// Read current telemetry from a device
    Read {
        /// Serial port name (e.g., COM3, /dev/ttyUSB0)
        port: String,

        /// Baud rate
        #[arg(short, long, default_value = "115200")]
        baud: u32,

        /// Only accept frames from this product identifier
        #[arg(long)]
        product: Option<String>,

        /// Only accept frames from this serial id
        #[arg(long)]
        serial_id: Option<String>,

        /// Seconds to wait for each channel
        #[arg(short, long, default_value = "2")]
        wait: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match cli.command {
        Commands::ListPorts => {
            let ports = list_ports().context("failed to enumerate serial ports")?;
            if ports.is_empty() {
                println!("No serial ports found");
            }
            for port in ports {
                println!("{}", port.port_name);
            }
            Ok(())
        }
        Commands::Read {
            port,
            baud,
            product,
            serial_id,
            wait,
        } => {
            let mut config = DeviceConfig::new(&port).baud_rate(baud);
            if let Some(product) = product.as_deref() {
                config = config.product(product);
            }
            if let Some(serial_id) = serial_id.as_deref() {
                config = config.serial_id(serial_id);
            }

            let device =
                Device::open(config).with_context(|| format!("failed to open {port}"))?;
            let timeout = Duration::from_secs(wait);

            report("pressure", device.pressure(timeout).map(|p| format!("{p} Pa")))?;
            report(
                "temperature",
                device.temperature(timeout).map(|t| format!("{t:.2} °C")),
            )?;
            report(
                "humidity",
                device.humidity(timeout).map(|h| format!("{h:.2} %")),
            )?;
            report("CO2", device.co2(timeout).map(|c| format!("{c:.2} ppm")))?;

            device.close().context("failed to close device")?;
            Ok(())
        }
    }
}

/// Print one channel's value, note its absence on timeout, and fail on a
/// dead reader.
fn report(label: &str, value: Result<String, TelemetryError>) -> anyhow::Result<()> {
    match value {
        Ok(value) => println!("{label}: {value}"),
        Err(TelemetryError::Timeout) => println!("{label}: (no data)"),
        Err(e @ TelemetryError::ReaderFailed(_)) => return Err(e.into()),
    }
    Ok(())
}
