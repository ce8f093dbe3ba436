//! S21 Monitor CLI Application
//!
//! Live terminal monitor for S21 traffic published on an MQTT bus.
//! It uses the s21-monitor-core library and adds:
//! - Configuration from environment, `.env`, TOML file and flags
//! - MQTT subscription to the device's TX/RX topics
//! - Replay of captured traffic from a JSON-lines file
//! - In-place terminal display of all commands and recent changes

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

mod config;
mod display;
mod monitor;
mod source;

use config::MonitorConfig;
use display::Renderer;
use monitor::Monitor;
use source::{install_shutdown_handler, MqttSource, ReplaySource};

/// S21 Monitor - watch S21 commands change in real time
#[derive(Parser, Debug)]
#[command(name = "s21-monitor")]
#[command(about = "Live monitor for S21 protocol traffic over MQTT", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// MQTT broker host (overrides MQTT_HOST)
    #[arg(long)]
    host: Option<String>,

    /// MQTT broker port (overrides MQTT_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Device id for the info/<device>/tx|rx topics (overrides DEVICE_ID)
    #[arg(short, long)]
    device: Option<String>,

    /// Replay captured messages from a JSON-lines file instead of connecting
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("S21 Monitor v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using core library v{}", s21_monitor_core::VERSION);

    let mut config = MonitorConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    apply_args(&mut config, &args);

    let mut monitor = Monitor::new(Renderer::new(config.display.clone()));

    match &args.replay {
        Some(path) => {
            let mut source = ReplaySource::open(path)?;
            monitor.run(&mut source)
        }
        None => {
            let shutdown = install_shutdown_handler()?;
            let mut source = MqttSource::connect(&config, shutdown)?;
            monitor.run(&mut source)
        }
    }
}

/// Command-line flags take precedence over every other source
fn apply_args(config: &mut MonitorConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.mqtt.host = host.clone();
    }
    if let Some(port) = args.port {
        config.mqtt.port = port;
    }
    if let Some(device) = &args.device {
        config.device_id = Some(device.clone());
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
