///! CLI entry point: loads a pool snapshot, an event log, gas averages and a
///! strategy descriptor from an input directory, replays the log, and writes
///! the resulting pool snapshot and strategy outcome to an output directory.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use clamm_replay::io;
use clamm_replay::replay::Replay;

/// Replays a historical CLAMM event log against a pool snapshot.
#[derive(Debug, Parser)]
#[command(name = "clamm-replay", version, about)]
struct Cli {
    /// Directory containing poolBefore.txt, transactions.txt, gas.txt, strategy.txt
    input_dir: PathBuf,

    /// Directory to write poolBefore.txt, poolAfter.txt, strategyBefore.txt, strategyAfter.txt into
    output_dir: PathBuf,

    /// Overrides RUST_LOG for this run (e.g. "debug", "clamm_replay=trace")
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run(&cli).context("replay run failed")
}

fn run(cli: &Cli) -> Result<()> {
    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating output directory {}", cli.output_dir.display()))?;

    let pool_path = cli.input_dir.join("poolBefore.txt");
    let mut pool = io::load_pool(&pool_path).with_context(|| format!("loading {}", pool_path.display()))?;

    let events_path = cli.input_dir.join("transactions.txt");
    let events = io::load_events(&events_path).with_context(|| format!("loading {}", events_path.display()))?;

    let gas_path = cli.input_dir.join("gas.txt");
    let gas_averages = io::load_gas_averages(&gas_path).with_context(|| format!("loading {}", gas_path.display()))?;

    let strategy_path = cli.input_dir.join("strategy.txt");
    let descriptor =
        io::load_strategy_descriptor(&strategy_path).with_context(|| format!("loading {}", strategy_path.display()))?;
    let mut strategy = io::strategy_from_descriptor(&descriptor, "strategy", gas_averages)
        .context("constructing strategy from descriptor")?;

    io::write_pool(&cli.output_dir.join("poolBefore.txt"), &pool).context("writing poolBefore.txt")?;
    io::write_strategy_result(&cli.output_dir.join("strategyBefore.txt"), &strategy)
        .context("writing strategyBefore.txt")?;

    tracing::info!(event_count = events.len(), "starting replay");
    {
        let mut replay = Replay::new(&mut pool, Some(&mut strategy), descriptor.update_interval);
        replay.run(&events).context("replaying event log")?;
    }
    tracing::info!("replay complete");

    io::write_pool(&cli.output_dir.join("poolAfter.txt"), &pool).context("writing poolAfter.txt")?;
    io::write_strategy_result(&cli.output_dir.join("strategyAfter.txt"), &strategy)
        .context("writing strategyAfter.txt")?;

    Ok(())
}
