//! Ambient Radar CLI
//!
//! Streams observation batches through the disturbance pipeline and prints
//! the heatmap after every processed batch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use radar_app::{init_logging, RadarConfig};
use radar_signal::{ProcessedBatch, RadarPipeline, SimulatedSource};

#[derive(Parser)]
#[command(name = "ambient-radar")]
#[command(about = "Passive WiFi motion heatmap", long_about = None)]
struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Monitor-mode interface
    #[arg(long)]
    interface: Option<String>,

    /// WiFi channel
    #[arg(long)]
    channel: Option<u8>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline against simulated traffic
    Run {
        /// Seed for reproducible traffic and diffusion placement
        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many batches
        #[arg(long, default_value = "20")]
        iterations: usize,

        /// Emit one JSON object per batch instead of a text heatmap
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Print the effective configuration as JSON
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = RadarConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let mut config = loaded.config;
    config.apply_overrides(cli.interface, cli.channel);

    let log_config = if cli.verbose {
        config.logging.clone().verbose()
    } else {
        config.logging.clone()
    };
    init_logging(&log_config)?;

    if !loaded.file_found {
        tracing::warn!("Config file {} not found, using defaults", cli.config.display());
    }

    config.validate()?;

    match cli.command {
        Commands::Run {
            seed,
            iterations,
            json,
        } => run(&config, seed, iterations, json).await,
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run(config: &RadarConfig, seed: Option<u64>, iterations: usize, json: bool) -> Result<()> {
    let pipeline_config = config.pipeline_config()?;
    let now = radar_core::wall_clock_secs();

    let (mut pipeline, source) = match seed {
        Some(seed) => (
            RadarPipeline::seeded(pipeline_config, seed, now)?,
            SimulatedSource::seeded(config.simulation.clone(), seed)?,
        ),
        None => (
            RadarPipeline::new(pipeline_config, now)?,
            SimulatedSource::new(config.simulation.clone())?,
        ),
    };
    let source = source.with_batch_limit(iterations);

    tracing::info!(
        interface = %config.capture.interface,
        channel = config.capture.channel,
        iterations,
        "Starting simulated capture"
    );

    let grid = pipeline.grid();
    let mut rx = pipeline.start_streaming(source).await?;

    while let Some(batch) = rx.recv().await {
        if json {
            println!("{}", serde_json::to_string(&batch)?);
        } else {
            print_heatmap(&batch);
        }
    }

    pipeline.stop().await;

    let stats = grid.statistics();
    tracing::info!(
        max = stats.max_value,
        mean = stats.mean_value,
        active = stats.active_cell_count,
        bins = stats.history_length,
        "Run complete"
    );

    Ok(())
}

const SHADES: [char; 5] = [' ', '.', ':', '*', '#'];

fn shade(value: f64) -> char {
    let index = (value.clamp(0.0, 1.0) * (SHADES.len() - 1) as f64).round() as usize;
    SHADES[index.min(SHADES.len() - 1)]
}

fn print_heatmap(batch: &ProcessedBatch) {
    let stats = &batch.statistics;
    let scale = if stats.max_value > 0.0 { stats.max_value } else { 1.0 };

    println!(
        "packets={} score={:.3} max={:.3} mean={:.3} active={}{}",
        batch.packet_count,
        batch.score,
        stats.max_value,
        stats.mean_value,
        stats.active_cell_count,
        if batch.flush.is_some() { " [flush]" } else { "" }
    );
    for row in &batch.heatmap {
        let line: String = row.iter().map(|v| shade(v / scale)).collect();
        println!("|{}|", line);
    }
}
