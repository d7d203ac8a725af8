use tracing_subscriber::filter::{EnvFilter, ParseError};

/// Address the server binds to when none is configured.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";

/// Largest accepted request body (bytes). Store requests are a few dozen bytes.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Log filter used when neither `--log-filter` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Parse a tracing filter directive such as `info` or `latencydb_server=debug`.
pub fn parse_log_filter(directive: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_new(directive)
}
