// Cumulative counters -> incremental interval series, with reset detection and window clipping.

use tracing::{debug, warn};

use crate::models::{CounterSample, IntervalSample, ResourceCounts, TimeWindow};

/// Rebuilds the interval series of one VM from its ordered counter samples.
#[derive(Debug, Clone, Copy)]
pub struct SeriesReconstructor {
    /// Drop the first derived interval (the one anchored on the synthetic boot baseline).
    pub discard_boot_interval: bool,
}

impl Default for SeriesReconstructor {
    fn default() -> Self {
        Self {
            discard_boot_interval: true,
        }
    }
}

impl SeriesReconstructor {
    pub fn new(discard_boot_interval: bool) -> Self {
        Self {
            discard_boot_interval,
        }
    }

    /// Full reconstruction: deltas, optional boot-interval drop, then clip to `window`.
    pub fn reconstruct(
        &self,
        samples: &[CounterSample],
        window: &TimeWindow,
    ) -> Vec<IntervalSample> {
        if window.is_empty() {
            return Vec::new();
        }
        let derived = derive(samples);
        let series: Vec<IntervalSample> = if self.discard_boot_interval {
            derived.intervals
        } else {
            derived.boot.into_iter().chain(derived.intervals).collect()
        };
        clip_to_window(&series, window)
    }
}

/// Convert ordered cumulative samples into incremental intervals, boot interval included.
pub fn to_intervals(samples: &[CounterSample]) -> Vec<IntervalSample> {
    let derived = derive(samples);
    derived.boot.into_iter().chain(derived.intervals).collect()
}

struct Derived {
    /// Interval between the synthetic boot baseline and the first real sample.
    boot: Option<IntervalSample>,
    intervals: Vec<IntervalSample>,
}

// The first real sample is paired with a zeroed baseline at boot time. A pair whose
// cumulative totals decrease (reboot between polls) produces no interval.
fn derive(samples: &[CounterSample]) -> Derived {
    let mut boot = None;
    let mut intervals = Vec::with_capacity(samples.len());
    let mut prev: Option<&CounterSample> = None;

    for curr in samples {
        if let Some(marker) = curr.marker {
            debug!(captured_at = %curr.captured_at, ?marker, "skipping unavailable sample");
            continue;
        }
        let Some(base) = prev else {
            boot = match curr.boot_baseline() {
                Some(baseline) => delta(&baseline, curr).filter(|i| i.duration > 0.0),
                None => {
                    warn!(
                        captured_at = %curr.captured_at,
                        uptime = curr.uptime_seconds,
                        "unusable uptime; boot interval skipped"
                    );
                    None
                }
            };
            prev = Some(curr);
            continue;
        };

        match delta(base, curr) {
            Some(interval) if interval.duration > 0.0 => intervals.push(interval),
            Some(_) => {
                debug!(captured_at = %curr.captured_at, "skipping zero-length interval");
            }
            None => {
                warn!(
                    from = %base.captured_at,
                    to = %curr.captured_at,
                    "counter reset between samples (VM probably restarted); interval skipped"
                );
            }
        }
        prev = Some(curr);
    }
    Derived { boot, intervals }
}

/// Per-resource delta between two samples; `None` on a counter reset. A resource whose block
/// is missing on either side contributes zero and takes no part in reset detection.
fn delta(prev: &CounterSample, curr: &CounterSample) -> Option<IntervalSample> {
    let cpu = resource_delta(prev.cpu_total(), curr.cpu_total())?;
    let disk = resource_delta(prev.disk_total(), curr.disk_total())?;
    let nic = resource_delta(prev.nic_total(), curr.nic_total())?;

    Some(IntervalSample {
        interval_start: prev.captured_at,
        duration: secs(curr.captured_at - prev.captured_at),
        cpu_seconds_used: cpu,
        disk_bytes_moved: disk,
        nic_bytes_moved: nic,
        resource_counts: ResourceCounts {
            num_cpus: curr.cpu_core_times.as_ref().map_or(0, |c| c.len() as u32),
            num_disks: curr.disk_counters.as_ref().map_or(0, |d| d.len() as u32),
            num_nics: curr.nic_counters.as_ref().map_or(0, |n| n.len() as u32),
        },
    })
}

fn resource_delta(prev: Option<f64>, curr: Option<f64>) -> Option<f64> {
    match (prev, curr) {
        (Some(p), Some(c)) if c < p => None,
        (Some(p), Some(c)) => Some(c - p),
        _ => Some(0.0),
    }
}

/// Keep the part of each interval inside `window`; straddling intervals are scaled by the
/// overlapping fraction so their rate is unchanged.
pub fn clip_to_window(series: &[IntervalSample], window: &TimeWindow) -> Vec<IntervalSample> {
    if window.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(series.len());
    for interval in series {
        let start = interval.interval_start;
        let end = interval.interval_end();

        let cut_head = secs(window.start - start).max(0.0);
        let cut_tail = secs(end - window.end).max(0.0);
        let kept = interval.duration - cut_head - cut_tail;

        if kept <= 0.0 {
            continue;
        }
        if cut_head == 0.0 && cut_tail == 0.0 {
            out.push(interval.clone());
            continue;
        }
        let mut clipped = interval.scaled(kept / interval.duration);
        clipped.interval_start =
            start + chrono::Duration::microseconds((cut_head * 1e6).round() as i64);
        out.push(clipped);
    }
    out
}

fn secs(d: chrono::Duration) -> f64 {
    d.num_microseconds()
        .map(|us| us as f64 / 1e6)
        .unwrap_or_else(|| d.num_seconds() as f64)
}
