// Per-VM analysis pipeline:
// samples -> reconstruct -> saturation (disk, nic) -> stats + histograms -> scores.
// Pure and synchronous; one VM's data is processed by exactly one caller.

pub mod aggregation;
pub mod reconstruct;
pub mod saturation;
pub mod scoring;

pub use reconstruct::SeriesReconstructor;
pub use scoring::Damping;

use crate::models::{
    CounterSample, Evaluation, IntervalSample, Level, RateStats, Resource, ResourceStats,
    TimeWindow, VmEvaluation,
};
use scoring::Representative;
use tracing::debug;

/// Default number of histogram bins (deciles).
pub const DEFAULT_NFRAGMENTS: usize = 10;

/// Resolved parameters for one VM's analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisParams {
    pub level: Level,
    /// Bytes per second.
    pub threshold_disk: f64,
    /// Bytes per second.
    pub threshold_nic: f64,
    pub cpu: bool,
    pub disk: bool,
    pub nic: bool,
    pub damping: Damping,
    pub nfragments: usize,
    pub discard_boot_interval: bool,
    /// Drop VMs without any valid resource score instead of reporting overall 0.
    pub remove_unknown: bool,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            level: Level::Soft,
            threshold_disk: 4096.0,
            threshold_nic: 4096.0,
            cpu: true,
            disk: true,
            nic: true,
            damping: Damping::default(),
            nfragments: DEFAULT_NFRAGMENTS,
            discard_boot_interval: true,
            remove_unknown: false,
        }
    }
}

impl AnalysisParams {
    pub fn enabled(&self, resource: Resource) -> bool {
        match resource {
            Resource::Cpu => self.cpu,
            Resource::Disk => self.disk,
            Resource::Nic => self.nic,
        }
    }
}

/// Analyze one VM's ordered samples over `window`.
///
/// Returns `None` only when `remove_unknown` is set and no enabled resource has a score.
pub fn analyze_vm(
    vm_id: &str,
    samples: &[CounterSample],
    window: &TimeWindow,
    params: &AnalysisParams,
) -> Option<VmEvaluation> {
    let reconstructor = SeriesReconstructor::new(params.discard_boot_interval);
    let mut series = reconstructor.reconstruct(samples, window);
    analyze_series(vm_id, &mut series, params)
}

/// Analysis over an already reconstructed series. Mutates `series` (saturation filter).
pub fn analyze_series(
    vm_id: &str,
    series: &mut [IntervalSample],
    params: &AnalysisParams,
) -> Option<VmEvaluation> {
    let level = params.level;
    let raw_stats = resource_stats(series);
    let damping = params.damping.for_level(level);
    saturation::apply_saturation(series, Resource::Disk, params.threshold_disk, damping);
    saturation::apply_saturation(series, Resource::Nic, params.threshold_nic, damping);

    let stats = resource_stats(series);

    let configured_cpus = series
        .first()
        .map(|i| i.resource_counts.num_cpus)
        .unwrap_or(0);
    let ncpu = scoring::cpu_base(level, configured_cpus, stats.cpu.map(|s| s.max));
    let representative = Representative::for_level(level);

    let view: &[IntervalSample] = series;
    let evaluate = |resource: Resource, high: f64, resource_stats: Option<RateStats>| {
        let histogram = aggregation::histogram(view, resource, 0.0, high, params.nfragments);
        let representative_rate = resource_stats.map(|s| representative.pick(&s));
        Evaluation {
            score: scoring::score(histogram.as_ref()),
            score2: scoring::score2(representative_rate, high),
            histogram,
            representative_rate,
        }
    };
    let cpu = evaluate(Resource::Cpu, ncpu, stats.cpu);
    let disk = evaluate(Resource::Disk, params.threshold_disk, stats.disk);
    let nic = evaluate(Resource::Nic, params.threshold_nic, stats.nic);

    let evaluated = [
        (Resource::Cpu, &cpu),
        (Resource::Disk, &disk),
        (Resource::Nic, &nic),
    ];
    let scores: Vec<f64> = evaluated
        .iter()
        .filter(|(r, _)| params.enabled(*r))
        .filter_map(|(_, e)| e.score)
        .collect();

    let overall = match scoring::overall(&scores, level) {
        Some(v) => v,
        None if params.remove_unknown => {
            debug!(vm_id = %vm_id, "no valid data in the window; VM removed");
            return None;
        }
        None => 0.0,
    };

    let suggested_cores = stats.cpu.map_or(0, |s| s.max.ceil().max(0.0) as u32);
    debug!(
        vm_id = %vm_id,
        intervals = series.len(),
        level = %level,
        overall,
        "vm evaluated"
    );

    Some(VmEvaluation {
        vm_id: vm_id.to_string(),
        level,
        cpu,
        disk,
        nic,
        stats,
        raw_stats,
        suggested_cores,
        intervals: series.len(),
        overall,
    })
}

fn resource_stats(series: &[IntervalSample]) -> ResourceStats {
    ResourceStats {
        cpu: aggregation::stats(series, Resource::Cpu),
        disk: aggregation::stats(series, Resource::Disk),
        nic: aggregation::stats(series, Resource::Nic),
    }
}
