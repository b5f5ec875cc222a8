use clap::{Parser, Subcommand};
use cl200_rs::{
    find_ports_by_manufacturer, init_logger, log_info, log_warn, Photometer, ProtocolOptions,
    Reading, SerialConfig,
};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cl200-cli")]
#[command(about = "CLI tool for CL-200A photometers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List candidate luxmeter ports by USB manufacturer
    Scan {
        #[arg(short, long, default_value = "Prolific")]
        manufacturer: String,
    },
    /// Connect to a device and poll lux measurements
    Measure {
        port: String,
        /// Seconds between measurements
        #[arg(short, long, default_value = "1")]
        interval: u64,
        /// Number of readings to take (runs forever when omitted)
        #[arg(short, long)]
        count: Option<u64>,
        /// Verify checksums on incoming frames
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan { manufacturer } => {
            let ports = find_ports_by_manufacturer(&manufacturer)?;
            if ports.is_empty() {
                log_warn(&format!("No ports matching {manufacturer:?}"));
            }
            for port in ports {
                log_info(&format!("Port: {port}"));
            }
        }
        Commands::Measure {
            port,
            interval,
            count,
            strict,
        } => {
            let options = ProtocolOptions {
                strict_checksum: strict,
                ..ProtocolOptions::default()
            };
            let mut meter =
                Photometer::connect(&port, SerialConfig::default(), options).await?;
            log_info(&format!("Connected to CL-200A on {port}"));

            let mut taken = 0u64;
            while count.map_or(true, |c| taken < c) {
                match meter.read_lux().await? {
                    Reading::Value { lux, warning } => {
                        taken += 1;
                        match warning {
                            Some(w) => log_info(&format!("Reading: {lux} lx (warning: {w:?})")),
                            None => log_info(&format!("Reading: {lux} lx")),
                        }
                    }
                    Reading::NoData => log_info("No fresh data, skipping cycle"),
                }
                tokio::time::sleep(Duration::from_secs(interval)).await;
            }
        }
    }

    Ok(())
}
