// Histogram -> 0..10 score, threshold-ratio score2, strictness policy and overall score.

use crate::models::{Histogram, Level, RateStats};

pub const MAX_SCORE: f64 = 10.0;

/// Saturation damping per strictness level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Damping {
    pub hard: f64,
    pub medium: f64,
    pub soft: f64,
    pub softer: f64,
}

impl Default for Damping {
    fn default() -> Self {
        Self {
            hard: 0.25,
            medium: 0.75,
            soft: 0.85,
            softer: 0.85,
        }
    }
}

impl Damping {
    pub fn for_level(&self, level: Level) -> f64 {
        match level {
            Level::Hard => self.hard,
            Level::Medium => self.medium,
            Level::Soft => self.soft,
            Level::Softer => self.softer,
        }
    }
}

/// Which statistic stands for "the" rate of a resource under a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representative {
    Min,
    Median,
    Mean,
}

impl Representative {
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::Hard | Level::Softer => Representative::Min,
            Level::Medium => Representative::Median,
            Level::Soft => Representative::Mean,
        }
    }

    pub fn pick(&self, stats: &RateStats) -> f64 {
        match self {
            Representative::Min => stats.min,
            Representative::Median => stats.median,
            Representative::Mean => stats.mean,
        }
    }
}

/// CPU normalization base (cores) for `level`.
///
/// `configured_cpus` is the vCPU count reported for the VM; `observed_max` the highest
/// busy-cores rate seen in the series. Never below 1.
pub fn cpu_base(level: Level, configured_cpus: u32, observed_max: Option<f64>) -> f64 {
    let base = match level {
        Level::Hard => configured_cpus as f64,
        Level::Medium => match observed_max {
            Some(max) => max.ceil(),
            None => (configured_cpus as f64 / 2.0).ceil(),
        },
        Level::Soft | Level::Softer => 1.0,
    };
    base.max(1.0)
}

/// Weighted-average bin index rescaled to 0..10, rounded to 2 decimals.
pub fn score(histogram: Option<&Histogram>) -> Option<f64> {
    let histogram = histogram?;
    let n = histogram.nfragments();
    if n < 2 {
        return None;
    }
    let weighted: f64 = histogram
        .bins
        .iter()
        .enumerate()
        .map(|(p, w)| p as f64 * w)
        .sum();
    Some(round2(MAX_SCORE * weighted / (n - 1) as f64))
}

/// `min(10 * representative / threshold, 10)`, rounded to 2 decimals.
pub fn score2(representative: Option<f64>, threshold: f64) -> Option<f64> {
    let rate = representative?;
    if threshold <= 0.0 {
        return None;
    }
    Some(round2((MAX_SCORE * rate / threshold).min(MAX_SCORE)))
}

/// Mean of the available resource scores; `softer` counts the highest one twice.
/// `None` when there is no score at all.
pub fn overall(scores: &[f64], level: Level) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mut set = scores.to_vec();
    if level == Level::Softer {
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        set.push(max);
    }
    Some(round2(set.iter().sum::<f64>() / set.len() as f64))
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
