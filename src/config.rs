use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::analysis::{AnalysisParams, DEFAULT_NFRAGMENTS, Damping};
use crate::expr::{parse_bytes, parse_date};
use crate::models::Level;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub damping: DampingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Per-VM overrides keyed by VM id.
    #[serde(default)]
    pub overrides: HashMap<String, VmOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    /// When set, `prune` deletes snapshots older than this.
    pub retention_days: Option<u32>,
}

fn default_max_pool_size() -> u32 {
    4
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub level: Level,
    /// Byte quantity per second, e.g. "4K".
    #[serde(default = "default_threshold")]
    pub threshold_disk: String,
    #[serde(default = "default_threshold")]
    pub threshold_nic: String,
    #[serde(default = "default_true")]
    pub cpu: bool,
    #[serde(default = "default_true")]
    pub disk: bool,
    #[serde(default = "default_true")]
    pub nic: bool,
    /// Window start expression (see `expr::parse_date`).
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_to")]
    pub to: String,
    #[serde(default)]
    pub remove_unknown: bool,
    /// Restrict the analysis to these VMs (default: every VM in the store).
    pub vm_ids: Option<Vec<String>>,
    #[serde(default = "default_nfragments")]
    pub nfragments: usize,
    #[serde(default = "default_true")]
    pub discard_boot_interval: bool,
    /// Max VMs analyzed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            level: Level::default(),
            threshold_disk: default_threshold(),
            threshold_nic: default_threshold(),
            cpu: true,
            disk: true,
            nic: true,
            from: default_from(),
            to: default_to(),
            remove_unknown: false,
            vm_ids: None,
            nfragments: DEFAULT_NFRAGMENTS,
            discard_boot_interval: true,
            concurrency: default_concurrency(),
        }
    }
}

fn default_threshold() -> String {
    "4K".into()
}

fn default_true() -> bool {
    true
}

fn default_from() -> String {
    "begin".into()
}

fn default_to() -> String {
    "now".into()
}

fn default_nfragments() -> usize {
    DEFAULT_NFRAGMENTS
}

fn default_concurrency() -> usize {
    4
}

/// Saturation damping per level. Empirical constants; each must be in (0, 1].
#[derive(Debug, Clone, Deserialize)]
pub struct DampingConfig {
    #[serde(default = "default_damping_hard")]
    pub hard: f64,
    #[serde(default = "default_damping_medium")]
    pub medium: f64,
    #[serde(default = "default_damping_soft")]
    pub soft: f64,
    #[serde(default = "default_damping_soft")]
    pub softer: f64,
}

impl Default for DampingConfig {
    fn default() -> Self {
        let d = Damping::default();
        Self {
            hard: d.hard,
            medium: d.medium,
            soft: d.soft,
            softer: d.softer,
        }
    }
}

fn default_damping_hard() -> f64 {
    Damping::default().hard
}

fn default_damping_medium() -> f64 {
    Damping::default().medium
}

fn default_damping_soft() -> f64 {
    Damping::default().soft
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// "-" writes to stdout.
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub pretty: bool,
    /// Keep only VMs with overall < under_threshold.
    #[serde(default)]
    pub summarize: bool,
    #[serde(default = "default_under_threshold")]
    pub under_threshold: f64,
    /// Order by overall score, descending.
    #[serde(default)]
    pub sort: bool,
    #[serde(default)]
    pub include_stats: bool,
    #[serde(default)]
    pub include_eval_data: bool,
    #[serde(default)]
    pub include_graph: bool,
    /// Shorthand for the three include_* flags.
    #[serde(default)]
    pub full_report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            path: default_output_path(),
            overwrite: false,
            pretty: false,
            summarize: false,
            under_threshold: default_under_threshold(),
            sort: false,
            include_stats: false,
            include_eval_data: false,
            include_graph: false,
            full_report: false,
        }
    }
}

impl OutputConfig {
    pub fn include_stats(&self) -> bool {
        self.include_stats || self.full_report
    }

    pub fn include_eval_data(&self) -> bool {
        self.include_eval_data || self.full_report
    }

    pub fn include_graph(&self) -> bool {
        self.include_graph || self.full_report
    }
}

fn default_output_path() -> String {
    "-".into()
}

fn default_under_threshold() -> f64 {
    3.0
}

/// Per-VM overrides of the analysis section. `skip = true` leaves the VM out.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VmOverride {
    #[serde(default)]
    pub skip: bool,
    pub level: Option<Level>,
    pub threshold_disk: Option<String>,
    pub threshold_nic: Option<String>,
    pub cpu: Option<bool>,
    pub disk: Option<bool>,
    pub nic: Option<bool>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "vmidle.toml".into());
        Self::load_from_path(Path::new(&path))
    }

    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path.display(), e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        if let Some(days) = self.database.retention_days {
            anyhow::ensure!(
                days > 0,
                "database.retention_days must be > 0, got {}",
                days
            );
        }
        validate_threshold("analysis.threshold_disk", &self.analysis.threshold_disk)?;
        validate_threshold("analysis.threshold_nic", &self.analysis.threshold_nic)?;
        anyhow::ensure!(
            self.analysis.nfragments >= 2,
            "analysis.nfragments must be >= 2, got {}",
            self.analysis.nfragments
        );
        anyhow::ensure!(
            self.analysis.concurrency > 0,
            "analysis.concurrency must be > 0, got {}",
            self.analysis.concurrency
        );
        // Store bounds are unknown here; any instant will do to check the syntax.
        let reference = chrono::Utc::now();
        for (key, expr) in [
            ("analysis.from", &self.analysis.from),
            ("analysis.to", &self.analysis.to),
        ] {
            parse_date(expr, Some(reference), Some(reference), reference)
                .map_err(|e| anyhow::anyhow!("{}: {}", key, e))?;
        }
        for (name, value) in [
            ("damping.hard", self.damping.hard),
            ("damping.medium", self.damping.medium),
            ("damping.soft", self.damping.soft),
            ("damping.softer", self.damping.softer),
        ] {
            anyhow::ensure!(
                value > 0.0 && value <= 1.0,
                "{} must be in (0, 1], got {}",
                name,
                value
            );
        }
        anyhow::ensure!(
            (0.0..=10.0).contains(&self.output.under_threshold),
            "output.under_threshold must be between 0 and 10, got {}",
            self.output.under_threshold
        );
        anyhow::ensure!(!self.output.path.is_empty(), "output.path must be non-empty");
        for (vm_id, o) in &self.overrides {
            if let Some(t) = &o.threshold_disk {
                validate_threshold(&format!("overrides.{}.threshold_disk", vm_id), t)?;
            }
            if let Some(t) = &o.threshold_nic {
                validate_threshold(&format!("overrides.{}.threshold_nic", vm_id), t)?;
            }
        }
        Ok(())
    }

    /// Analysis parameters for `vm_id`: the `[analysis]` section with that VM's overrides applied.
    pub fn params_for(&self, vm_id: &str) -> anyhow::Result<AnalysisParams> {
        let a = &self.analysis;
        let mut params = AnalysisParams {
            level: a.level,
            threshold_disk: parse_bytes(&a.threshold_disk)?,
            threshold_nic: parse_bytes(&a.threshold_nic)?,
            cpu: a.cpu,
            disk: a.disk,
            nic: a.nic,
            damping: Damping {
                hard: self.damping.hard,
                medium: self.damping.medium,
                soft: self.damping.soft,
                softer: self.damping.softer,
            },
            nfragments: a.nfragments,
            discard_boot_interval: a.discard_boot_interval,
            remove_unknown: a.remove_unknown,
        };
        if let Some(o) = self.overrides.get(vm_id) {
            if let Some(level) = o.level {
                params.level = level;
            }
            if let Some(t) = &o.threshold_disk {
                params.threshold_disk = parse_bytes(t)?;
            }
            if let Some(t) = &o.threshold_nic {
                params.threshold_nic = parse_bytes(t)?;
            }
            params.cpu = o.cpu.unwrap_or(params.cpu);
            params.disk = o.disk.unwrap_or(params.disk);
            params.nic = o.nic.unwrap_or(params.nic);
        }
        Ok(params)
    }

    pub fn is_skipped(&self, vm_id: &str) -> bool {
        self.overrides.get(vm_id).is_some_and(|o| o.skip)
    }
}

fn validate_threshold(key: &str, expr: &str) -> anyhow::Result<()> {
    let bytes = parse_bytes(expr).map_err(|e| anyhow::anyhow!("{}: {}", key, e))?;
    anyhow::ensure!(bytes > 0.0, "{} must be > 0 bytes/s, got '{}'", key, expr);
    Ok(())
}
