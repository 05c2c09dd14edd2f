// Raw VM snapshot: cumulative counters since boot, as captured by the acquisition layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SnapshotError;

const NANOS_PER_SEC: f64 = 1e-9;

/// Why the control plane could not report the VM at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlPlaneMarker {
    ItemNotFound,
    ConflictingRequest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskCounter {
    pub bytes_read: u64,
    pub bytes_written: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicCounter {
    pub bytes_rx: u64,
    pub bytes_tx: u64,
}

/// One raw measurement of a VM. Counter blocks are `None` when the snapshot did not carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSample {
    pub captured_at: DateTime<Utc>,
    pub uptime_seconds: f64,
    /// Busy seconds per core.
    pub cpu_core_times: Option<Vec<f64>>,
    pub disk_counters: Option<Vec<DiskCounter>>,
    pub nic_counters: Option<Vec<NicCounter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<ControlPlaneMarker>,
}

impl CounterSample {
    /// Decode the acquisition layer's JSON document captured at `captured_at`.
    pub fn from_raw(captured_at: DateTime<Utc>, raw: &Value) -> Result<Self, SnapshotError> {
        let obj = raw.as_object().ok_or(SnapshotError::NotAnObject)?;

        let marker = if obj.contains_key("itemNotFound") {
            Some(ControlPlaneMarker::ItemNotFound)
        } else if obj.contains_key("conflictingRequest") {
            Some(ControlPlaneMarker::ConflictingRequest)
        } else {
            None
        };

        let uptime_seconds = obj.get("uptime").and_then(Value::as_f64).unwrap_or(0.0);

        let cpu_core_times = entries(obj.get("cpu_details")).map(|list| {
            list.iter()
                .map(|c| number(c, "time") * NANOS_PER_SEC)
                .collect()
        });
        let disk_counters = entries(obj.get("disk_details")).map(|list| {
            list.iter()
                .map(|d| DiskCounter {
                    bytes_read: counter(d, "read_bytes"),
                    bytes_written: counter(d, "write_bytes"),
                })
                .collect()
        });
        let nic_counters = entries(obj.get("nic_details")).map(|list| {
            list.iter()
                .map(|n| NicCounter {
                    bytes_rx: counter(n, "rx_octets"),
                    bytes_tx: counter(n, "tx_octets"),
                })
                .collect()
        });

        Ok(Self {
            captured_at,
            uptime_seconds,
            cpu_core_times,
            disk_counters,
            nic_counters,
            marker,
        })
    }

    /// Total busy CPU seconds across cores, `None` if the block is missing.
    pub fn cpu_total(&self) -> Option<f64> {
        self.cpu_core_times.as_ref().map(|c| c.iter().sum())
    }

    pub fn disk_total(&self) -> Option<f64> {
        self.disk_counters.as_ref().map(|d| {
            d.iter()
                .map(|c| c.bytes_read as f64 + c.bytes_written as f64)
                .sum()
        })
    }

    pub fn nic_total(&self) -> Option<f64> {
        self.nic_counters
            .as_ref()
            .map(|n| n.iter().map(|c| c.bytes_rx as f64 + c.bytes_tx as f64).sum())
    }

    /// Zeroed copy anchored at boot time (`captured_at - uptime`).
    /// `None` when the uptime is negative, not finite, or reaches outside the representable range.
    pub fn boot_baseline(&self) -> Option<Self> {
        let millis = (self.uptime_seconds * 1000.0).round();
        if !millis.is_finite() || millis < 0.0 || millis >= i64::MAX as f64 {
            return None;
        }
        let uptime = chrono::Duration::try_milliseconds(millis as i64)?;
        Some(Self {
            captured_at: self.captured_at.checked_sub_signed(uptime)?,
            uptime_seconds: 0.0,
            cpu_core_times: self
                .cpu_core_times
                .as_ref()
                .map(|c| vec![0.0; c.len()]),
            disk_counters: self
                .disk_counters
                .as_ref()
                .map(|d| vec![DiskCounter::default(); d.len()]),
            nic_counters: self
                .nic_counters
                .as_ref()
                .map(|n| vec![NicCounter::default(); n.len()]),
            marker: None,
        })
    }
}

fn entries(v: Option<&Value>) -> Option<&Vec<Value>> {
    v.and_then(Value::as_array)
}

fn number(entry: &Value, key: &str) -> f64 {
    entry.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn counter(entry: &Value, key: &str) -> u64 {
    entry
        .get(key)
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64)))
        .unwrap_or(0)
}
