//! slatebar - status line daemon for i3bar/swaybar

use anyhow::{Context, Result};
use clap::Parser;
use slatebar::codec::spawn_event_reader;
use slatebar::daemon::{GenerationOptions, Orchestrator, ShutdownOutcome, spawn_signal_listener};
use slatebar::worker::WorkerRegistry;
use slatebar_core::config::discover_config_path;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const EVENT_QUEUE: usize = 64;
const CONTROL_QUEUE: usize = 8;

/// Status line daemon for i3bar/swaybar
#[derive(Parser, Debug)]
#[command(name = "slatebar")]
#[command(about = "Status line daemon for i3bar/swaybar")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// How long reloads and shutdown wait for workers (overrides the config)
    #[arg(long, value_name = "MS")]
    shutdown_timeout_ms: Option<u64>,

    /// Do not reload when the config file changes
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = slatebar_core::logging::init(args.verbose, args.log.as_deref()) {
        eprintln!("slatebar: failed to open log file: {e}");
        std::process::exit(1);
    }

    let code = match run(args).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    // A blocking stdin read can keep the runtime alive; exit directly.
    std::process::exit(i32::from(code));
}

async fn run(args: Args) -> Result<ShutdownOutcome> {
    info!("slatebar {} starting", env!("CARGO_PKG_VERSION"));

    let config_path = match discover_config_path(args.config.as_deref()) {
        Ok(path) => {
            info!("Using config: {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("No config file: {}", e);
            None
        }
    };

    let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE);
    spawn_signal_listener(control_tx).context("Failed to install signal handlers")?;

    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
    spawn_event_reader(BufReader::new(tokio::io::stdin()), events_tx);

    let options = GenerationOptions {
        shutdown_timeout: args.shutdown_timeout_ms.map(Duration::from_millis),
        watch_config: !args.no_watch,
    };

    Orchestrator::new(WorkerRegistry::builtin(), config_path, tokio::io::stdout())
        .with_options(options)
        .run(events_rx, control_rx)
        .await
}
