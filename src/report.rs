// Report rendering: per-VM nested mapping, summarize/sort, JSON and CSV output.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::config::{AnalysisConfig, OutputConfig, OutputFormat};
use std::collections::BTreeMap;

use crate::models::{
    Evaluation, IntervalSample, RateStats, Resource, ResourceStats, VmEvaluation,
};

const BAR_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Clone, Serialize)]
pub struct ResourceReport {
    pub score: Option<f64>,
    pub score2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representative: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VmReport {
    pub cpu: ResourceReport,
    pub disk: ResourceReport,
    pub nic: ResourceReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    pub overall: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ResourceStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_stats: Option<ResourceStats>,
}

/// Ordered VM id -> report. Serializes as a JSON object preserving entry order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub entries: Vec<(String, VmReport)>,
}

impl Serialize for Report {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

/// Bar chart of `data` with one glyph per value, scaled over `[lower, upper]`.
pub fn bar_chart(data: &[f64], lower: f64, upper: f64) -> String {
    if upper <= lower {
        return BAR_GLYPHS[0].to_string().repeat(data.len());
    }
    let top = (BAR_GLYPHS.len() - 1) as f64;
    data.iter()
        .map(|d| {
            let v = (d - lower) / (upper - lower);
            let p = (v * top).round().clamp(0.0, top) as usize;
            BAR_GLYPHS[p]
        })
        .collect()
}

fn resource_report(e: &Evaluation, output: &OutputConfig) -> ResourceReport {
    let bins = e.histogram.as_ref().map(|h| h.bins.clone());
    ResourceReport {
        score: e.score,
        score2: e.score2,
        histogram: if output.include_eval_data() { bins.clone() } else { None },
        representative: if output.include_eval_data() {
            e.representative_rate
        } else {
            None
        },
        graph: if output.include_graph() {
            Some(bins.map(|b| bar_chart(&b, 0.0, 1.0)).unwrap_or_default())
        } else {
            None
        },
    }
}

/// Build the report, applying summarize (overall < under_threshold) and sort (descending).
pub fn build(
    evaluations: impl IntoIterator<Item = VmEvaluation>,
    output: &OutputConfig,
) -> Report {
    let mut entries: Vec<(String, VmReport)> = evaluations
        .into_iter()
        .filter(|e| !output.summarize || e.overall < output.under_threshold)
        .map(|e| {
            let report = VmReport {
                cpu: resource_report(&e.cpu, output),
                disk: resource_report(&e.disk, output),
                nic: resource_report(&e.nic, output),
                cores: output.include_eval_data().then_some(e.suggested_cores),
                overall: e.overall,
                stats: output.include_stats().then(|| e.stats.clone()),
                raw_stats: output.include_stats().then(|| e.raw_stats.clone()),
            };
            (e.vm_id, report)
        })
        .collect();
    if output.sort {
        entries.sort_by(|a, b| b.1.overall.total_cmp(&a.1.overall));
    }
    Report { entries }
}

pub fn to_json(report: &Report, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    })
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn stats_of(stats: &ResourceStats, resource: Resource) -> Option<&RateStats> {
    match resource {
        Resource::Cpu => stats.cpu.as_ref(),
        Resource::Disk => stats.disk.as_ref(),
        Resource::Nic => stats.nic.as_ref(),
    }
}

fn report_of(vm: &VmReport, resource: Resource) -> &ResourceReport {
    match resource {
        Resource::Cpu => &vm.cpu,
        Resource::Disk => &vm.disk,
        Resource::Nic => &vm.nic,
    }
}

/// CSV with a header row; columns follow the enabled resources and include flags.
pub fn to_csv(report: &Report, analysis: &AnalysisConfig, output: &OutputConfig) -> String {
    let enabled: Vec<Resource> = Resource::ALL
        .into_iter()
        .filter(|r| match r {
            Resource::Cpu => analysis.cpu,
            Resource::Disk => analysis.disk,
            Resource::Nic => analysis.nic,
        })
        .collect();
    let nbins = analysis.nfragments;
    let step = 100.0 / nbins as f64;

    let mut header = vec!["id".to_string(), "overall".to_string()];
    for r in &enabled {
        header.push(format!("{}.score", r.as_str()));
    }
    if output.include_eval_data() {
        for r in &enabled {
            for i in 0..nbins {
                header.push(format!(
                    "{} {}-{}",
                    r.as_str(),
                    (i as f64 * step).round(),
                    ((i + 1) as f64 * step).round()
                ));
            }
            if *r == Resource::Cpu {
                header.push("cpu.cores".into());
            }
        }
    }
    if output.include_graph() {
        for r in &enabled {
            header.push(format!("{}.graph", r.as_str()));
        }
    }
    if output.include_stats() {
        for r in &enabled {
            for s in ["min", "max", "mean", "median", "raw_max"] {
                header.push(format!("stats.{}.{}", r.as_str(), s));
            }
        }
    }

    let mut lines = vec![header.join(",")];
    for (vm_id, vm) in &report.entries {
        let mut fields = vec![escape_field(vm_id), vm.overall.to_string()];
        for r in &enabled {
            fields.push(opt(report_of(vm, *r).score));
        }
        if output.include_eval_data() {
            for r in &enabled {
                let bins = report_of(vm, *r).histogram.clone().unwrap_or_default();
                for i in 0..nbins {
                    fields.push(opt(bins.get(i).copied().filter(|v| *v != 0.0)));
                }
                if *r == Resource::Cpu {
                    fields.push(vm.cores.map(|c| c.to_string()).unwrap_or_default());
                }
            }
        }
        if output.include_graph() {
            for r in &enabled {
                fields.push(report_of(vm, *r).graph.clone().unwrap_or_default());
            }
        }
        if output.include_stats() {
            for r in &enabled {
                let s = vm.stats.as_ref().and_then(|st| stats_of(st, *r));
                fields.push(opt(s.map(|s| s.min)));
                fields.push(opt(s.map(|s| s.max)));
                fields.push(opt(s.map(|s| s.mean)));
                fields.push(opt(s.map(|s| s.median)));
                let raw = vm.raw_stats.as_ref().and_then(|st| stats_of(st, *r));
                fields.push(opt(raw.map(|s| s.max)));
            }
        }
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

pub fn render(
    report: &Report,
    analysis: &AnalysisConfig,
    output: &OutputConfig,
) -> anyhow::Result<String> {
    match output.format {
        OutputFormat::Json => to_json(report, output.pretty),
        OutputFormat::Csv => Ok(to_csv(report, analysis, output)),
    }
}

/// Interval series per VM as JSON (`{vm_id: [row, ...]}`) or CSV (one row per interval).
pub fn render_series(
    series: &BTreeMap<String, Vec<IntervalSample>>,
    output: &OutputConfig,
) -> anyhow::Result<String> {
    match output.format {
        OutputFormat::Json if output.pretty => Ok(serde_json::to_string_pretty(series)?),
        OutputFormat::Json => Ok(serde_json::to_string(series)?),
        OutputFormat::Csv => Ok(series_to_csv(series)),
    }
}

fn series_to_csv(series: &BTreeMap<String, Vec<IntervalSample>>) -> String {
    let mut lines = vec![
        "id,interval_start,duration,cpu_seconds_used,disk_bytes_moved,nic_bytes_moved,\
         num_cpus,num_disks,num_nics"
            .to_string(),
    ];
    for (vm_id, rows) in series {
        for i in rows {
            lines.push(format!(
                "{},{},{},{},{},{},{},{},{}",
                escape_field(vm_id),
                i.interval_start.to_rfc3339(),
                i.duration,
                i.cpu_seconds_used,
                i.disk_bytes_moved,
                i.nic_bytes_moved,
                i.resource_counts.num_cpus,
                i.resource_counts.num_disks,
                i.resource_counts.num_nics
            ));
        }
    }
    lines.join("\n")
}

/// Write `content` to `path` ("-" = stdout).
/// Refuses to replace an existing file unless `overwrite`.
pub fn write_output(path: &str, overwrite: bool, content: &str) -> anyhow::Result<()> {
    if path == "-" {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", content)?;
        return Ok(());
    }
    anyhow::ensure!(
        overwrite || !Path::new(path).exists(),
        "file '{}' already exists",
        path
    );
    std::fs::write(path, format!("{}\n", content))
        .map_err(|e| anyhow::anyhow!("writing {}: {}", path, e))?;
    Ok(())
}
