use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use rover_runtime::config::SERIAL_BAUDRATE;
use rover_runtime::runtime::{LinkChoice, RunOptions};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LinkKind {
    /// Simulated robot, commands on stdin, telemetry on stdout
    #[value(name = "sim-stdio")]
    Stdio,
    /// Commands and telemetry over a serial port
    Serial,
}

/// Robot control loop: drive, obstacle interlock, claw and launcher sequences
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[arg(long, value_enum, default_value_t = LinkKind::Stdio)]
    link: LinkKind,

    /// Serial device, e.g. /dev/ttyUSB0
    #[arg(long, required_if_eq("link", "serial"))]
    port: Option<String>,

    #[arg(long, default_value_t = SERIAL_BAUDRATE)]
    baud: u32,

    /// JSON file overriding the built-in configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many cycles (0 = run until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    max_cycles: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Setup logging (set RUST_LOG=info or debug). Stdout may carry telemetry, so log to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let link = match (args.link, args.port) {
        (LinkKind::Serial, Some(port)) => LinkChoice::Serial {
            port,
            baudrate: args.baud,
        },
        (LinkKind::Serial, None) => {
            eprintln!("--port is required for the serial link");
            std::process::exit(2);
        }
        (LinkKind::Stdio, _) => LinkChoice::Stdio,
    };

    let options = RunOptions {
        link,
        config_path: args.config,
        max_cycles: (args.max_cycles > 0).then_some(args.max_cycles),
    };

    if let Err(e) = rover_runtime::runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
