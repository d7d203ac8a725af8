use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest percentile accepted by a query.
pub const MIN_PERCENTILE: f64 = 0.0;

/// Highest percentile accepted by a query.
pub const MAX_PERCENTILE: f64 = 100.0;

/// Returns `true` if `p` lies in `[MIN_PERCENTILE, MAX_PERCENTILE]`. NaN is never valid.
pub fn is_valid_percentile(p: f64) -> bool {
    (MIN_PERCENTILE..=MAX_PERCENTILE).contains(&p)
}

/// Error types surfaced to LatencyDB clients
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum LatencyDbError {
    #[error("no data available")]
    NoData,

    #[error("percentile must be between 0 and 100, got {0}")]
    InvalidPercentile(f64),

    #[error("duration must be non-negative, got {0} ms")]
    NegativeDuration(i64),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("Malformed server response: {0}")]
    MalformedResponse(String),
}

/// JSON error envelope returned by the server for all error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `POST /store`.
///
/// `timestamp` is an RFC 3339 string; it stays a string on the wire so the server
/// can reject it with its own message instead of a generic decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRequest {
    pub timestamp: String,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreResponse {
    pub status: String,
}

/// Body of a successful `GET /percentile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileResponse {
    pub percentile: f64,
    pub response_time_ms: u64,
}

/// Body of `GET /stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_entries: usize,
    /// `true` when the sorted cache reflects every stored entry.
    pub cache_valid: bool,
    pub cache_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Result type for LatencyDB operations
pub type Result<T> = std::result::Result<T, LatencyDbError>;
