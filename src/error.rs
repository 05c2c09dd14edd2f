// Typed errors for decoding raw snapshots and parsing user expressions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot document is not a JSON object")]
    NotAnObject,
    #[error("invalid capture time '{0}'")]
    InvalidCaptureTime(String),
    #[error("snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("invalid byte quantity '{0}'")]
    InvalidBytes(String),
    #[error("invalid date expression '{0}'")]
    InvalidDate(String),
    #[error("date expression '{0}' refers to '{1}' but the store holds no data")]
    NoReference(String, &'static str),
}
