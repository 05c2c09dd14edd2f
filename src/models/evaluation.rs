// Statistics, decile histograms and idleness evaluations (per resource and per VM).

use serde::{Deserialize, Serialize};

/// Duration-weighted descriptive statistics of a per-second rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub deviation: f64,
    pub pct_deviation: f64,
}

/// Equal-width bins over `[low, high]`, each holding the fraction of time spent there.
/// Bins sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub low: f64,
    pub high: f64,
    pub bins: Vec<f64>,
}

impl Histogram {
    pub fn nfragments(&self) -> usize {
        self.bins.len()
    }
}

/// Strictness policy: selects the cpu normalization base, representative statistic and damping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Hard,
    Medium,
    #[default]
    Soft,
    Softer,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Hard => "hard",
            Level::Medium => "medium",
            Level::Soft => "soft",
            Level::Softer => "softer",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hard" => Ok(Level::Hard),
            "medium" => Ok(Level::Medium),
            "soft" => Ok(Level::Soft),
            "softer" => Ok(Level::Softer),
            other => Err(format!("unknown level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// 0-10, weighted-average bin index; `None` for an empty series.
    pub score: Option<f64>,
    pub histogram: Option<Histogram>,
    /// Linear ratio of the representative rate to the threshold, capped at 10.
    pub score2: Option<f64>,
    pub representative_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStats {
    pub cpu: Option<RateStats>,
    pub disk: Option<RateStats>,
    pub nic: Option<RateStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmEvaluation {
    pub vm_id: String,
    pub level: Level,
    pub cpu: Evaluation,
    pub disk: Evaluation,
    pub nic: Evaluation,
    /// Stats of the saturation-filtered series (what the scores see).
    pub stats: ResourceStats,
    /// Stats before the saturation filter; keeps the real disk/nic peaks.
    pub raw_stats: ResourceStats,
    /// `ceil(max cpu rate)`, 0 without cpu data.
    pub suggested_cores: u32,
    pub intervals: usize,
    pub overall: f64,
}
