// Batch driver: resolves the analysis window, builds the queue of pending VMs and analyzes
// them on the blocking pool with bounded concurrency. Each VM is owned by one task.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tracing::{debug, info, instrument, warn};

use crate::analysis::{SeriesReconstructor, analyze_vm};
use crate::config::AppConfig;
use crate::expr::parse_date;
use crate::models::{IntervalSample, TimeWindow, VmEvaluation};
use crate::snapshot_repo::SnapshotRepo;

/// Resolve `analysis.from` / `analysis.to` against the store's first and last capture.
pub fn resolve_window(
    config: &AppConfig,
    bounds: Option<(DateTime<Utc>, DateTime<Utc>)>,
    now: DateTime<Utc>,
) -> anyhow::Result<TimeWindow> {
    let (begin, end) = match bounds {
        Some((b, e)) => (Some(b), Some(e)),
        None => (None, None),
    };
    let start = parse_date(&config.analysis.from, begin, end, now)
        .map_err(|e| anyhow::anyhow!("analysis.from: {}", e))?;
    let stop = parse_date(&config.analysis.to, begin, end, now)
        .map_err(|e| anyhow::anyhow!("analysis.to: {}", e))?;
    Ok(TimeWindow::new(start, stop))
}

/// VMs to analyze: the configured allow-list or every VM in the store, minus skipped ones.
pub async fn pending_vms(
    repo: &SnapshotRepo,
    config: &AppConfig,
) -> anyhow::Result<VecDeque<String>> {
    let candidates = match &config.analysis.vm_ids {
        Some(ids) => ids.clone(),
        None => repo.list_vms().await?,
    };
    Ok(candidates
        .into_iter()
        .filter(|id| {
            let skip = config.is_skipped(id);
            if skip {
                debug!(vm_id = %id, "skipped by override");
            }
            !skip
        })
        .collect())
}

/// Analyze every pending VM over `window`. VMs whose data cannot be loaded are logged and
/// left out; VMs dropped by `remove_unknown` are absent from the result.
#[instrument(skip(repo, config), fields(start = %window.start, end = %window.end))]
pub async fn run(
    repo: Arc<SnapshotRepo>,
    config: Arc<AppConfig>,
    window: TimeWindow,
) -> anyhow::Result<BTreeMap<String, VmEvaluation>> {
    let queue = pending_vms(&repo, &config).await?;
    let pending = queue.len();
    let concurrency = config.analysis.concurrency;

    let results: Vec<Option<VmEvaluation>> = futures_util::stream::iter(queue)
        .map(|vm_id| {
            let repo = repo.clone();
            let config = config.clone();
            async move {
                match analyze_one(&repo, &config, vm_id.clone(), window).await {
                    Ok(evaluation) => evaluation,
                    Err(e) => {
                        warn!(vm_id = %vm_id, error = %e, "analysis failed");
                        None
                    }
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let out: BTreeMap<String, VmEvaluation> = results
        .into_iter()
        .flatten()
        .map(|e| (e.vm_id.clone(), e))
        .collect();
    info!(pending, evaluated = out.len(), "analysis complete");
    Ok(out)
}

/// Reconstructed, windowed interval series of every pending VM, before saturation.
/// VMs with no interval inside the window are left out.
#[instrument(skip(repo, config), fields(start = %window.start, end = %window.end))]
pub async fn reconstruct_all(
    repo: Arc<SnapshotRepo>,
    config: Arc<AppConfig>,
    window: TimeWindow,
) -> anyhow::Result<BTreeMap<String, Vec<IntervalSample>>> {
    let queue = pending_vms(&repo, &config).await?;
    let reconstructor = SeriesReconstructor::new(config.analysis.discard_boot_interval);

    let results: Vec<(String, Vec<IntervalSample>)> = futures_util::stream::iter(queue)
        .map(|vm_id| {
            let repo = repo.clone();
            async move {
                let samples = match repo.get_vm_samples(&vm_id, None, None).await {
                    Ok(samples) => samples,
                    Err(e) => {
                        warn!(vm_id = %vm_id, error = %e, "loading samples failed");
                        return (vm_id, Vec::new());
                    }
                };
                let series = tokio::task::spawn_blocking(move || {
                    reconstructor.reconstruct(&samples, &window)
                })
                .await
                .unwrap_or_else(|e| {
                    warn!(vm_id = %vm_id, error = %e, "reconstruction task join");
                    Vec::new()
                });
                (vm_id, series)
            }
        })
        .buffer_unordered(config.analysis.concurrency)
        .collect()
        .await;

    let out: BTreeMap<String, Vec<IntervalSample>> = results
        .into_iter()
        .filter(|(_, series)| !series.is_empty())
        .collect();
    info!(vms = out.len(), "reconstruction complete");
    Ok(out)
}

async fn analyze_one(
    repo: &SnapshotRepo,
    config: &AppConfig,
    vm_id: String,
    window: TimeWindow,
) -> anyhow::Result<Option<VmEvaluation>> {
    let params = config.params_for(&vm_id)?;
    // Whole history: intervals straddling the window edges are clipped, not lost.
    let samples = repo.get_vm_samples(&vm_id, None, None).await?;
    debug!(vm_id = %vm_id, samples = samples.len(), "samples loaded");
    if samples.is_empty() {
        return Ok(None);
    }
    tokio::task::spawn_blocking(move || analyze_vm(&vm_id, &samples, &window, &params))
        .await
        .map_err(|e| anyhow::anyhow!("analysis task join: {}", e))
}
