//! # RIO Port Binary
//!
//! Configures one bus port from a TOML file and keeps its boards refreshed
//! with a periodic read/write loop.
//!
//! # Usage
//!
//! ```bash
//! # Run the simulation bus with the default config
//! rio_port --config /etc/rio/port.toml
//!
//! # Select a bus driver and stop after 5000 cycles
//! rio_port -c port.toml --driver simulation --cycles 5000
//!
//! # Verbose JSON logs
//! rio_port -c port.toml -v --json
//! ```

use clap::Parser;
use rio_common::config::{ConfigLoader, LogLevel};
use rio_common::consts::DEFAULT_CONFIG_PATH;
use rio_common::port::config::PortConfig;
use rio_port::drivers::register_all_buses;
use rio_port::{BusRegistry, CycleRunner};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// RIO Port - board I/O over a shared field bus
#[derive(Parser, Debug)]
#[command(name = "rio_port")]
#[command(version)]
#[command(about = "Robot controller board port with cyclic read/write")]
#[command(long_about = None)]
struct Args {
    /// Path to the port configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Bus driver to use.
    #[arg(short, long, default_value = "simulation")]
    driver: String,

    /// Override the configured port number.
    #[arg(short, long)]
    port: Option<u32>,

    /// Stop after this many cycles (runs until Ctrl-C if omitted).
    #[arg(long)]
    cycles: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Port startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = PortConfig::load(&args.config);
    let level = config
        .as_ref()
        .map_or(LogLevel::Info, |c| c.shared.log_level);
    setup_tracing(&args, level);

    info!("RIO Port v{} starting...", env!("CARGO_PKG_VERSION"));
    let mut config = config.inspect_err(|e| {
        error!("Failed to load {}: {}", args.config.display(), e);
    })?;
    if let Some(port) = args.port {
        config.port_number = port;
    }

    let mut registry = BusRegistry::new();
    register_all_buses(&mut registry);
    info!(
        "Bus driver '{}' (available: {:?})",
        args.driver,
        registry.list_drivers()
    );
    let bus = registry.create_bus(&args.driver, &config)?;

    let mut runner = CycleRunner::new(bus, &config)?.with_max_cycles(args.cycles);
    let port = runner.port();
    info!(
        "Port {}: robots {:?} (actuators {:?}, brakes {:?}), {} DI, {} DO",
        port.port_number(),
        port.robot_names(),
        port.actuators_per_robot(),
        port.brakes_per_robot(),
        port.number_of_digital_inputs(),
        port.number_of_digital_outputs()
    );

    let running = runner.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    runner.run();

    for status in runner.port().board_statuses() {
        info!(
            "Board {}: fault={:?}, read errors={}, write errors={}",
            status.address, status.fault, status.total_read_errors, status.total_write_errors
        );
    }
    info!("RIO Port shutdown complete");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
