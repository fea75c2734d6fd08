//! # bytereg
//!
//! Binds every compatible instance from a platform description, performs one
//! endpoint operation and unbinds again.
//!
//! # Usage
//!
//! ```bash
//! # Show bound endpoints
//! bytereg --config platform.toml list
//!
//! # One-byte register read / write
//! bytereg --config platform.toml read simple
//! bytereg --config platform.toml write simple 0x7f
//!
//! # Verbose, JSON output
//! bytereg --config platform.toml -v --json list
//! ```

use bytereg_common::config::{ByteregConfig, LogLevel};
use bytereg_common::consts::DEFAULT_CONFIG_PATH;
use bytereg_driver::{dev_mem_bus, PlatformBus};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// bytereg - single-byte memory-mapped register endpoints
#[derive(Parser, Debug)]
#[command(name = "bytereg")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Bind memory-mapped byte registers and access them through endpoints")]
#[command(long_about = None)]
struct Args {
    /// Platform configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose logging (overrides log_level from the config)
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and listings in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List bound endpoints
    List,
    /// Read one byte from an endpoint
    Read {
        /// Endpoint node name (e.g. "simple")
        node: String,
    },
    /// Write one byte to an endpoint
    Write {
        /// Endpoint node name (e.g. "simple")
        node: String,
        /// Byte value, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_byte)]
        value: u8,
    },
}

/// One row of `bytereg list`.
#[derive(Debug, Serialize)]
struct NodeInfo {
    node: String,
    minor: u8,
    instance: String,
    compatible: String,
    base: u64,
    length: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("bytereg failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = ByteregConfig::load_validated(&args.config);
    let log_level = loaded
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);

    let config = loaded.map_err(|e| format!("{}: {e}", args.config.display()))?;
    info!(
        "bytereg v{} starting ({} devices described, memory device {})",
        env!("CARGO_PKG_VERSION"),
        config.platform.devices.len(),
        config.driver.mem_device.display()
    );

    let mut bus = dev_mem_bus(&config.driver);
    let report = bus.populate(&config.platform);

    let result = execute(&args, &bus);
    bus.shutdown();
    result?;

    if !report.is_clean() {
        let names: Vec<&str> = report.failed.iter().map(|(n, _)| n.as_str()).collect();
        return Err(format!("bind failed for: {}", names.join(", ")).into());
    }
    Ok(())
}

fn execute(args: &Args, bus: &PlatformBus) -> Result<(), Box<dyn std::error::Error>> {
    let endpoints = bus.endpoints();
    match &args.command {
        Command::List => {
            let rows: Vec<NodeInfo> = endpoints
                .list()
                .into_iter()
                .filter_map(|id| {
                    let session = endpoints.open(id.minor).ok()?;
                    let dev = session.device();
                    Some(NodeInfo {
                        node: id.name.to_string(),
                        minor: id.minor,
                        instance: dev.instance().to_string(),
                        compatible: dev.compatible().to_string(),
                        base: dev.range().base,
                        length: dev.range().length,
                    })
                })
                .collect();

            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!(
                        "{:<10} {:>3}  {:<24} {:<28} {:#x}+{:#x}",
                        row.node, row.minor, row.instance, row.compatible, row.base, row.length
                    );
                }
            }
        }
        Command::Read { node } => {
            let session = endpoints.open_by_name(node)?;
            let mut buf = [0u8; 1];
            let n = session.read(&mut buf, 1, &mut 0);
            session.close();
            if n == 1 {
                println!("{:#04x}", buf[0]);
            } else {
                println!("{node}: 0 bytes read");
            }
        }
        Command::Write { node, value } => {
            let session = endpoints.open_by_name(node)?;
            let n = session.write(&[*value], 1, &mut 0);
            session.close();
            println!("{node}: {n} byte(s) written");
        }
    }
    Ok(())
}

/// Parse a byte given as decimal or `0x` hex.
fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid byte '{s}': {e}"))
}

fn level_of(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        level_of(configured)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
