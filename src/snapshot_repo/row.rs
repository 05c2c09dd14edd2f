// Row <-> model conversion for vm_snapshots; also the import line format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SnapshotError;
use crate::models::CounterSample;

/// One stored snapshot as exchanged with the acquisition layer (one JSON line on import).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub vm_id: String,
    pub captured_at: DateTime<Utc>,
    pub data: Value,
}

impl RawSnapshot {
    pub fn from_json_line(line: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(line)?)
    }
}

pub(super) fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

pub(super) fn decode(captured_at_ms: i64, data: &str) -> Result<CounterSample, SnapshotError> {
    let captured_at = from_millis(captured_at_ms)
        .ok_or_else(|| SnapshotError::InvalidCaptureTime(captured_at_ms.to_string()))?;
    let doc: Value = serde_json::from_str(data)?;
    CounterSample::from_raw(captured_at, &doc)
}
