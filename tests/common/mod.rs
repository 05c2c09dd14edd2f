// Shared test helpers
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use vmidle::models::*;
use vmidle::snapshot_repo::RawSnapshot;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

/// Sample `secs` after t0 with one core, one disk and one nic carrying the given totals.
pub fn sample(secs: i64, uptime: f64, cpu: f64, disk: u64, nic: u64) -> CounterSample {
    CounterSample {
        captured_at: at(secs),
        uptime_seconds: uptime,
        cpu_core_times: Some(vec![cpu]),
        disk_counters: Some(vec![DiskCounter {
            bytes_read: disk,
            bytes_written: 0,
        }]),
        nic_counters: Some(vec![NicCounter {
            bytes_rx: nic,
            bytes_tx: 0,
        }]),
        marker: None,
    }
}

pub fn interval(start_secs: i64, duration: f64, cpu: f64, disk: f64, nic: f64) -> IntervalSample {
    IntervalSample {
        interval_start: at(start_secs),
        duration,
        cpu_seconds_used: cpu,
        disk_bytes_moved: disk,
        nic_bytes_moved: nic,
        resource_counts: ResourceCounts {
            num_cpus: 2,
            num_disks: 1,
            num_nics: 1,
        },
    }
}

/// Consecutive intervals of `duration` seconds, one per `(cpu, disk, nic)` total.
pub fn series(duration: f64, totals: &[(f64, f64, f64)]) -> Vec<IntervalSample> {
    totals
        .iter()
        .enumerate()
        .map(|(i, (c, d, n))| interval(i as i64 * duration as i64, duration, *c, *d, *n))
        .collect()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

pub fn full_window() -> TimeWindow {
    TimeWindow::new(at(-1_000_000), at(1_000_000))
}

/// Acquisition-layer document: one core (`cpu_secs` busy), one disk, one nic.
pub fn raw_doc(uptime: f64, cpu_secs: f64, disk: u64, nic: u64) -> Value {
    json!({
        "uptime": uptime,
        "cpu_details": [{ "id": 0, "time": (cpu_secs * 1e9) as u64 }],
        "disk_details": [{ "read_bytes": disk, "write_bytes": 0 }],
        "nic_details": [{ "rx_octets": nic, "tx_octets": 0 }],
    })
}

/// Snapshots of `vm_id` every `step` seconds from t0, busy `cpu_rate` cores, `disk_rate` B/s.
pub fn raw_history(
    vm_id: &str,
    count: i64,
    step: i64,
    cpu_rate: f64,
    disk_rate: u64,
) -> Vec<RawSnapshot> {
    (0..count)
        .map(|i| {
            let elapsed = (i * step) as f64;
            RawSnapshot {
                vm_id: vm_id.to_string(),
                captured_at: at(i * step),
                data: raw_doc(elapsed, elapsed * cpu_rate, (i * step) as u64 * disk_rate, 0),
            }
        })
        .collect()
}
