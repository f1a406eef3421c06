//! Dropwatch binary.
//!
//! `serve` runs the trigger gateway over HTTP; `replay` drives a recorded
//! trajectory through the tracking pipeline and the same gateway.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dropwatch_alert::{AlertMachine, LogAlarm, Pipeline, PipelineConfig};
use dropwatch_server::{build_gateway, replay, run_server, AppState, Config};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Falling-object danger detection and alerting
#[derive(Parser)]
#[command(name = "dropwatch")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the trigger gateway over HTTP
    Serve {
        /// Port to listen on (overrides DROPWATCH_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Replay a recorded trajectory file
    Replay {
        /// One frame per line: `x,y`, `x1,y1,x2,y2`, or `-` for a miss
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json)?;

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        targets = config.targets.len(),
        rounds = config.rounds,
        interval_secs = config.interval.as_secs(),
        workers = config.workers,
        direction_source = %config.direction_source,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Serve { port } => {
            let gateway = build_gateway(&config)?;
            run_server(AppState { gateway }, port.unwrap_or(config.port)).await
        }
        Commands::Replay { file } => run_replay(&config, &file).await,
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("dropwatch=info".parse()?)
        .add_directive("dropwatch_alert=info".parse()?)
        .add_directive("dropwatch_notify=info".parse()?)
        .add_directive("dropwatch_server=info".parse()?);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

async fn run_replay(config: &Config, file: &Path) -> Result<()> {
    let input = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let frames = replay::parse_frames(&input).context("Invalid replay file")?;

    let gateway = build_gateway(config)?;
    let machine = AlertMachine::new(Arc::clone(&gateway), Arc::new(LogAlarm::new()));
    let mut pipeline = Pipeline::new(
        PipelineConfig {
            estimator: config.estimator,
            direction_source: config.direction_source,
        },
        machine,
    );

    let mut detector = replay::ReplayDetector::new(frames);
    for (index, outcome) in replay::run(&mut pipeline, &mut detector) {
        match outcome {
            Some(o) => println!(
                "frame {index:>4}  raw ({:>8.2}, {:>8.2})  smoothed ({:>8.2}, {:>8.2})  {:<10}  {}",
                o.measurement.x, o.measurement.y, o.smoothed.x, o.smoothed.y, o.event, o.state
            ),
            None => println!("frame {index:>4}  no detection"),
        }
    }

    let stats = pipeline.stats();
    info!(
        processed = stats.processed,
        missed = stats.missed,
        rejected = stats.rejected,
        in_flight = gateway.in_flight(),
        "Replay finished, waiting for alert fan-outs"
    );
    gateway.drain().await;

    let snapshot = gateway.snapshot();
    println!(
        "activations: {}  dispatches: {}  final state: {}",
        snapshot.activations, snapshot.dispatches, snapshot.state
    );
    Ok(())
}
