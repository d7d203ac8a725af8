use chrono::{DateTime, SecondsFormat, Utc};
use latencydb_common::{
    is_valid_percentile, ErrorResponse, HealthResponse, LatencyDbError, PercentileResponse,
    Result, StatsResponse, StoreRequest, StoreResponse,
};
use serde::de::DeserializeOwned;

/// LatencyDB client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
}

/// LatencyDB Client
pub struct Client {
    pub config: ClientConfig,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build the URL for `path` (which must start with `/`) against the configured server.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Store one response time observed at `timestamp`.
    pub async fn store(&self, timestamp: DateTime<Utc>, duration_ms: i64) -> Result<()> {
        if duration_ms < 0 {
            return Err(LatencyDbError::NegativeDuration(duration_ms));
        }

        let request = StoreRequest {
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            duration_ms,
        };

        let response = self
            .http_client
            .post(self.build_url("/store"))
            .json(&request)
            .send()
            .await
            .map_err(|e| LatencyDbError::NetworkError(e.to_string()))?;

        let _: StoreResponse = decode(response).await?;
        Ok(())
    }

    /// Store one response time stamped with the current time.
    pub async fn store_now(&self, duration_ms: i64) -> Result<()> {
        self.store(Utc::now(), duration_ms).await
    }

    /// Fetch the response time at percentile `p` (0 to 100 inclusive).
    /// Returns `NoData` when the server has nothing stored.
    pub async fn percentile(&self, p: f64) -> Result<PercentileResponse> {
        if !is_valid_percentile(p) {
            return Err(LatencyDbError::InvalidPercentile(p));
        }

        let response = self
            .http_client
            .get(self.build_url("/percentile"))
            .query(&[("percentile", p)])
            .send()
            .await
            .map_err(|e| LatencyDbError::NetworkError(e.to_string()))?;

        decode(response).await
    }

    pub async fn stats(&self) -> Result<StatsResponse> {
        let response = self
            .http_client
            .get(self.build_url("/stats"))
            .send()
            .await
            .map_err(|e| LatencyDbError::NetworkError(e.to_string()))?;

        decode(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http_client
            .get(self.build_url("/health"))
            .send()
            .await
            .map_err(|e| LatencyDbError::NetworkError(e.to_string()))?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(parse_error_response(status, response).await);
    }

    response
        .json::<T>()
        .await
        .map_err(|e| LatencyDbError::MalformedResponse(e.to_string()))
}

/// A 404 is only `NoData` when the envelope says so; other 404s (unknown routes,
/// proxies) stay `HttpError`.
async fn parse_error_response(status: reqwest::StatusCode, response: reqwest::Response) -> LatencyDbError {
    let error_msg = response
        .json::<ErrorResponse>()
        .await
        .map(|r| r.error)
        .unwrap_or_else(|_| format!("Server returned status: {}", status));

    if status == reqwest::StatusCode::NOT_FOUND && error_msg == LatencyDbError::NoData.to_string() {
        return LatencyDbError::NoData;
    }

    LatencyDbError::HttpError(status.as_u16(), error_msg)
}
