//! Streams assets through the computation on a bounded pool of blocking workers.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{debug, info, warn};

use crate::compute::{
    compute_asset, AssetStreamProvider, ComputeSettings, RegionSelector, ResultRecord,
};
use crate::hazards::HazardProvider;
use crate::sink::ResultsSink;
use crate::structures::StochasticAsset;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: u64,
    pub written: u64,
    /// Assets outside the hazard.
    pub skipped: u64,
    /// Assets whose computation failed and were left out.
    pub failed: u64,
    pub substitutions: u64,
    pub cancelled: bool,
}

struct Outcome {
    name: String,
    substituted: bool,
    result: crate::error::Result<Option<ResultRecord>>,
}

pub struct Pipeline {
    hazard: Arc<dyn HazardProvider>,
    settings: Arc<ComputeSettings>,
    workers: usize,
    channel_capacity: usize,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(hazard: Arc<dyn HazardProvider>, settings: ComputeSettings) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            hazard,
            settings: Arc::new(settings),
            workers,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Setting the flag stops the asset stream; records already in flight are
    /// still written.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn settings(&self) -> &ComputeSettings {
        &self.settings
    }

    /// Records reach the sink in stream order regardless of which worker
    /// finishes first. Per-asset failures are logged and counted; any other
    /// error aborts the run.
    pub async fn run(
        &self,
        assets: Arc<dyn AssetStreamProvider>,
        selector: RegionSelector,
        sink: &mut dyn ResultsSink,
    ) -> Result<RunSummary> {
        info!(
            workers = self.workers,
            seed = self.settings.rng.master_seed(),
            central_tendency = self.settings.central_tendency,
            life_loss = self.settings.life_loss.is_some(),
            "starting consequence run"
        );

        let (tx, rx) = mpsc::channel::<(u64, StochasticAsset)>(self.channel_capacity);
        let stop = self.stop.clone();
        let producer = tokio::task::spawn_blocking(move || -> crate::error::Result<u64> {
            let mut index = 0u64;
            assets.for_region(&selector, &mut |asset| {
                if stop.load(Ordering::SeqCst) || tx.blocking_send((index, asset)).is_err() {
                    return ControlFlow::Break(());
                }
                index += 1;
                ControlFlow::Continue(())
            })?;
            Ok(index)
        });

        let mut stream = ReceiverStream::new(rx);
        let mut tasks: JoinSet<(u64, Outcome)> = JoinSet::new();
        let mut pending = BTreeMap::new();
        let mut next_index = 0u64;
        let mut summary = RunSummary::default();

        while let Some((index, asset)) = stream.next().await {
            summary.processed += 1;
            while tasks.len() >= self.workers {
                if let Some(joined) = tasks.join_next().await {
                    let (done, outcome) = joined.context("asset worker panicked")?;
                    pending.insert(done, outcome);
                }
                flush(&mut pending, &mut next_index, sink, &mut summary)?;
            }

            let hazard = self.hazard.clone();
            let settings = self.settings.clone();
            tasks.spawn_blocking(move || {
                let outcome = Outcome {
                    name: asset.name.clone(),
                    substituted: asset.occupancy_substituted(),
                    result: compute_asset(index, &asset, hazard.as_ref(), &settings),
                };
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (done, outcome) = joined.context("asset worker panicked")?;
            pending.insert(done, outcome);
        }
        flush(&mut pending, &mut next_index, sink, &mut summary)?;

        let streamed = producer
            .await
            .context("asset producer panicked")?
            .context("asset stream failed")?;
        summary.cancelled = self.stop.load(Ordering::SeqCst);
        sink.close()?;

        info!(
            streamed,
            processed = summary.processed,
            written = summary.written,
            skipped = summary.skipped,
            failed = summary.failed,
            substitutions = summary.substitutions,
            cancelled = summary.cancelled,
            "consequence run finished"
        );
        Ok(summary)
    }
}

fn flush(
    pending: &mut BTreeMap<u64, Outcome>,
    next_index: &mut u64,
    sink: &mut dyn ResultsSink,
    summary: &mut RunSummary,
) -> Result<()> {
    while let Some(outcome) = pending.remove(&*next_index) {
        if outcome.substituted {
            summary.substitutions += 1;
        }
        match outcome.result {
            Ok(Some(record)) => {
                sink.write(&record)
                    .with_context(|| format!("Failed to write result for '{}'", outcome.name))?;
                summary.written += 1;
            }
            Ok(None) => {
                debug!(asset = %outcome.name, "asset outside hazard, skipped");
                summary.skipped += 1;
            }
            Err(err) if err.is_per_asset() => {
                warn!(asset = %outcome.name, error = %err, "asset computation failed, skipped");
                summary.failed += 1;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to compute '{}'", outcome.name));
            }
        }
        *next_index += 1;
    }
    Ok(())
}
