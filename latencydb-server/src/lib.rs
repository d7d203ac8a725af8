use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use latencydb_common::{
    ErrorResponse, HealthResponse, PercentileResponse, StatsResponse, StoreRequest, StoreResponse,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod store;

use config::MAX_BODY_SIZE;
use store::{PercentileStore, QueryError};

/// Endpoints served by [`Server::create_router`], logged at startup.
pub const ENDPOINTS: [(&str, &str, &str); 4] = [
    ("POST", "/store", "Store response time"),
    ("GET", "/percentile", "Get percentile"),
    ("GET", "/stats", "Service statistics"),
    ("GET", "/health", "Health check"),
];

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PercentileStore>,
}

impl AppState {
    pub fn new(store: Arc<PercentileStore>) -> Self {
        Self { store }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(PercentileStore::new()))
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

/// LatencyDB Server
pub struct Server {
    config: ServerConfig,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Get the server's configured address
    pub fn address(&self) -> SocketAddr {
        self.config.address
    }

    /// Create the application router with the given state
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/store", post(store_route).fallback(handle_method_not_allowed))
            .route("/percentile", get(handle_percentile).fallback(handle_method_not_allowed))
            .route("/stats", get(handle_stats).fallback(handle_method_not_allowed))
            .route("/health", get(handle_health).fallback(handle_method_not_allowed))
            .fallback(handle_not_found)
            .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
            .with_state(state)
    }

    /// Run the server with a fresh store, signalling `ready_tx` with the bound address once accepting connections
    pub async fn run(self, ready_tx: tokio::sync::oneshot::Sender<SocketAddr>) -> Result<(), Box<dyn std::error::Error>> {
        self.run_with_store(Arc::new(PercentileStore::new()), ready_tx).await
    }

    /// Run the server on top of an existing store.
    pub async fn run_with_store(
        self,
        store: Arc<PercentileStore>,
        ready_tx: tokio::sync::oneshot::Sender<SocketAddr>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let app = Self::create_router(AppState::new(store));
        let listener = tokio::net::TcpListener::bind(self.config.address).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("In-memory response time service listening on {}", local_addr);
        for (method, path, description) in ENDPOINTS {
            tracing::info!("   {:<4} {:<11} - {}", method, path, description);
        }

        ready_tx.send(local_addr).ok();
        axum::serve(listener, app).await?;
        Ok(())
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|ts| ts.with_timezone(&Utc))
}

/// Turns body extraction failures (oversized or unreadable bodies) into the JSON error
/// envelope before delegating to [`handle_store`].
async fn store_route(state: State<AppState>, body: Result<Bytes, BytesRejection>) -> Response {
    match body {
        Ok(body) => handle_store(state, body).await,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejecting store body");
            let status = rejection.status();
            if status == StatusCode::PAYLOAD_TOO_LARGE {
                error_response(status, format!("request body exceeds {} bytes", MAX_BODY_SIZE))
            } else {
                error_response(status, rejection.body_text())
            }
        }
    }
}

/// Handler for POST /store: records one measurement from a JSON body.
/// `timestamp` must be RFC 3339 and `duration_ms` a non-negative integer.
pub async fn handle_store(State(state): State<AppState>, body: Bytes) -> Response {
    if body.len() > MAX_BODY_SIZE {
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("request body exceeds {} bytes", MAX_BODY_SIZE),
        );
    }

    let request: StoreRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting malformed store request");
            return error_response(StatusCode::BAD_REQUEST, "invalid request");
        }
    };

    let Some(timestamp) = parse_timestamp(&request.timestamp) else {
        tracing::debug!(timestamp = %request.timestamp, "rejecting store request");
        return error_response(StatusCode::BAD_REQUEST, "invalid timestamp");
    };

    let Ok(duration_ms) = u64::try_from(request.duration_ms) else {
        tracing::debug!(duration_ms = request.duration_ms, "rejecting store request");
        return error_response(StatusCode::BAD_REQUEST, "duration_ms must be non-negative");
    };

    state.store.record(timestamp, Duration::from_millis(duration_ms));

    Json(StoreResponse { status: "ok".to_string() }).into_response()
}

/// Handler for GET /percentile?percentile=<p>: returns the response time at `p`.
/// 404 when nothing has been stored yet, 400 for a missing, unparseable or out-of-range `p`.
pub async fn handle_percentile(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let raw = match params.get("percentile") {
        Some(v) if !v.is_empty() => v,
        _ => return error_response(StatusCode::BAD_REQUEST, "missing percentile"),
    };

    let p: f64 = match raw.parse() {
        Ok(p) => p,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "invalid percentile"),
    };

    match state.store.query_percentile(p) {
        Ok(duration) => Json(PercentileResponse {
            percentile: p,
            response_time_ms: duration.as_millis() as u64,
        })
        .into_response(),
        Err(e) => {
            tracing::debug!(percentile = p, error = %e, "percentile query failed");
            let status = match e {
                QueryError::NoData => StatusCode::NOT_FOUND,
                QueryError::InvalidPercentile(_) => StatusCode::BAD_REQUEST,
            };
            error_response(status, e.to_string())
        }
    }
}

/// Handler for GET /stats: entry count and sorted-cache status.
pub async fn handle_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.store.stats();
    Json(StatsResponse {
        total_entries: stats.count,
        cache_valid: stats.index_valid,
        cache_size: stats.index_size,
    })
}

/// Handler for GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy".to_string() })
}

/// Fallback for a known path hit with an unsupported method.
pub async fn handle_method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

/// Fallback for unknown paths.
pub async fn handle_not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not found")
}
