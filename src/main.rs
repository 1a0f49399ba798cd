// src/main.rs
//! Vehicle telemetry relay - UDP NMEA in, WebSocket JSON out

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use vehicle_telemetry::{PipelineConfig, PipelineSupervisor};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON configuration file; defaults plus environment overrides are used otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.as_str()))
        .init();

    let config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::from_env().context("reading environment")?,
    };
    config.validate()?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("GPS relay starting");
    for source in &config.sources {
        info!(
            "[{}] {}: UDP {} -> ws://{}",
            source.label.to_uppercase(),
            source.vehicle,
            source.udp_addr(),
            source.ws_addr()
        );
    }
    info!("Supported NMEA sentences: GGA, RMC, VTG");

    let supervisor = PipelineSupervisor::start(&config).await?;
    if !supervisor.has_running() {
        bail!(
            "no vehicle source could start ({} failed)",
            supervisor.failures().len()
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;
    info!("Received Ctrl+C, shutting down");
    supervisor.shutdown();

    Ok(())
}
