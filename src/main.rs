//! Command-line runner for a scenario file.

use std::{path::PathBuf, sync::atomic::Ordering, sync::Arc};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use consequences::{
    compute::RegionSelector,
    pipeline::Pipeline,
    scenario::ScenarioLoader,
    sink::JsonLinesSink,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Flood damage and life-loss runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/riverside.yaml")]
    scenario: PathBuf,

    /// JSON-lines file receiving one record per asset
    #[arg(long, default_value = "results/consequences.jsonl")]
    output: PathBuf,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Use central-tendency values instead of sampling
    #[arg(long)]
    central_tendency: bool,

    /// Number of concurrent asset workers
    #[arg(long)]
    workers: Option<usize>,

    /// Skip life-loss computation even when the scenario configures it
    #[arg(long)]
    no_life_loss: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&scenario.logging.level)),
        )
        .init();

    let hazard = scenario.build_hazard()?;
    let assets = Arc::new(scenario.build_asset_provider()?);
    let settings =
        scenario.compute_settings(cli.seed, cli.central_tendency, !cli.no_life_loss)?;

    let mut pipeline = Pipeline::new(hazard, settings);
    if let Some(workers) = cli.workers.or(scenario.workers) {
        pipeline = pipeline.with_workers(workers);
    }

    let stop = pipeline.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping asset stream");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let mut sink = JsonLinesSink::create(&cli.output)?;
    info!(scenario = %scenario.name, output = %cli.output.display(), "running scenario");
    let summary = pipeline.run(assets, RegionSelector::All, &mut sink).await?;

    println!(
        "Scenario '{}' finished: {} assets processed, {} written, {} outside hazard, {} failed, {} occupancy substitutions{}",
        scenario.name,
        summary.processed,
        summary.written,
        summary.skipped,
        summary.failed,
        summary.substitutions,
        if summary.cancelled { " (interrupted)" } else { "" }
    );
    Ok(())
}
