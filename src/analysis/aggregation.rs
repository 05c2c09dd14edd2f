// Duration-weighted statistics and occupancy histograms over an interval series.
// An interval of `e` seconds at rate `r` counts as `e` occurrences of `r`.

use crate::models::{Histogram, IntervalSample, RateStats, Resource};

/// Weighted min/max/mean/median/deviation of the `resource` rate. `None` for an empty series.
pub fn stats(series: &[IntervalSample], resource: Resource) -> Option<RateStats> {
    let mut values: Vec<(f64, f64)> = series
        .iter()
        .filter(|i| i.duration > 0.0)
        .map(|i| (i.duration, i.rate(resource)))
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.1.total_cmp(&b.1));

    let total: f64 = values.iter().map(|(e, _)| e).sum();
    let mean = values.iter().map(|(e, r)| e * r).sum::<f64>() / total;

    let midpoint = total / 2.0;
    let mut running = 0.0;
    let mut median = values[values.len() - 1].1;
    for (e, r) in &values {
        running += e;
        if running > midpoint {
            median = *r;
            break;
        }
    }

    // Sample deviation over `total` weighted occurrences; undefined for total <= 1.
    let deviation = if total > 1.0 {
        let sq: f64 = values.iter().map(|(e, r)| e * (r - mean).powi(2)).sum();
        (sq / (total - 1.0)).sqrt()
    } else {
        0.0
    };

    let min = values[0].1;
    let max = values[values.len() - 1].1;
    let pct_deviation = if max == min {
        0.0
    } else {
        deviation / (max - min)
    };

    Some(RateStats {
        min,
        max,
        mean,
        median,
        deviation,
        pct_deviation,
    })
}

/// Fraction of time the `resource` rate spent in each of `nfragments` equal bins over
/// `[low, high]`. Out-of-range rates land in the nearest edge bin. `None` for an empty series.
pub fn histogram(
    series: &[IntervalSample],
    resource: Resource,
    low: f64,
    high: f64,
    nfragments: usize,
) -> Option<Histogram> {
    if nfragments == 0 {
        return None;
    }
    let width = (high - low) / nfragments as f64;
    let last = nfragments - 1;

    let mut bins = vec![0.0; nfragments];
    let mut total = 0.0;
    for interval in series.iter().filter(|i| i.duration > 0.0) {
        let rate = interval.rate(resource);
        let p = if width > 0.0 {
            let raw = ((rate - low) / width).floor();
            if raw <= 0.0 {
                0
            } else {
                (raw as usize).min(last)
            }
        } else if rate <= low {
            0
        } else {
            last
        };
        bins[p] += interval.duration;
        total += interval.duration;
    }
    if total <= 0.0 {
        return None;
    }
    for b in &mut bins {
        *b /= total;
    }
    Some(Histogram { low, high, bins })
}
