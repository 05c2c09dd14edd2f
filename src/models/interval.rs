// Incremental, duration-weighted series derived from consecutive counter samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource dimension a rate or score refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Cpu,
    Disk,
    Nic,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Cpu, Resource::Disk, Resource::Nic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Cpu => "cpu",
            Resource::Disk => "disk",
            Resource::Nic => "nic",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCounts {
    pub num_cpus: u32,
    pub num_disks: u32,
    pub num_nics: u32,
}

/// Analysis window `[start, end]`. `start > end` is allowed and selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Usage accrued over `[interval_start, interval_start + duration)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalSample {
    pub interval_start: DateTime<Utc>,
    /// Seconds; always > 0 once the series leaves the reconstructor.
    pub duration: f64,
    pub cpu_seconds_used: f64,
    pub disk_bytes_moved: f64,
    pub nic_bytes_moved: f64,
    pub resource_counts: ResourceCounts,
}

impl IntervalSample {
    pub fn interval_end(&self) -> DateTime<Utc> {
        self.interval_start + chrono::Duration::microseconds((self.duration * 1e6).round() as i64)
    }

    /// Incremental total for `resource` (cpu seconds or bytes).
    pub fn total(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Cpu => self.cpu_seconds_used,
            Resource::Disk => self.disk_bytes_moved,
            Resource::Nic => self.nic_bytes_moved,
        }
    }

    pub fn total_mut(&mut self, resource: Resource) -> &mut f64 {
        match resource {
            Resource::Cpu => &mut self.cpu_seconds_used,
            Resource::Disk => &mut self.disk_bytes_moved,
            Resource::Nic => &mut self.nic_bytes_moved,
        }
    }

    /// Per-second rate (cores busy for cpu, bytes/s otherwise).
    pub fn rate(&self, resource: Resource) -> f64 {
        if self.duration > 0.0 {
            self.total(resource) / self.duration
        } else {
            0.0
        }
    }

    /// Scale duration and every total by `fraction` (window clipping).
    pub fn scaled(&self, fraction: f64) -> Self {
        Self {
            interval_start: self.interval_start,
            duration: self.duration * fraction,
            cpu_seconds_used: self.cpu_seconds_used * fraction,
            disk_bytes_moved: self.disk_bytes_moved * fraction,
            nic_bytes_moved: self.nic_bytes_moved * fraction,
            resource_counts: self.resource_counts,
        }
    }
}
