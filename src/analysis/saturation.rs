// Saturation filter: clip bursts to the threshold rate and carry the damped excess forward.

use crate::models::{IntervalSample, Resource};

/// Clip every interval of `series` whose `resource` rate exceeds `threshold_rate`.
///
/// The volume above the threshold is moved into the next interval, scaled by `damping`.
/// The excess of the last interval has no successor and is dropped.
pub fn apply_saturation(
    series: &mut [IntervalSample],
    resource: Resource,
    threshold_rate: f64,
    damping: f64,
) {
    for i in 0..series.len() {
        let current = &mut series[i];
        if current.rate(resource) <= threshold_rate {
            continue;
        }
        let cap = threshold_rate * current.duration;
        let excess = current.total(resource) - cap;
        *current.total_mut(resource) = cap;

        if let Some(next) = series.get_mut(i + 1) {
            *next.total_mut(resource) += excess * damping;
        }
    }
}
