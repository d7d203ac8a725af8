//! In-memory percentile store.
//!
//! Measurements are appended to a log in arrival order. Percentile queries are
//! answered from a sorted copy of the durations that is rebuilt lazily: every
//! `record` marks it dirty, and the next query rebuilds it before reading.

use chrono::{DateTime, Utc};
use latencydb_common::is_valid_percentile;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;

/// A single recorded latency sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
}

/// Failures returned by [`PercentileStore::query_percentile`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum QueryError {
    #[error("no data available")]
    NoData,

    #[error("percentile must be between 0 and 100")]
    InvalidPercentile(f64),
}

/// Point-in-time view returned by [`PercentileStore::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub count: usize,
    pub index_valid: bool,
    pub index_size: usize,
}

struct StoreState {
    measurements: Vec<Measurement>,
    sorted: Vec<Duration>,
    dirty: bool,
}

impl StoreState {
    fn rebuild(&mut self) {
        self.sorted.clear();
        self.sorted.extend(self.measurements.iter().map(|m| m.duration));
        self.sorted.sort_unstable();
        self.dirty = false;
        tracing::trace!(entries = self.sorted.len(), "rebuilt sorted index");
    }

    /// Caller must hold a fresh, non-empty index.
    fn value_at(&self, p: f64) -> Duration {
        self.sorted[nearest_rank_index(p, self.sorted.len())]
    }
}

/// Position of the `p`-th percentile in an ascending slice of length `n`.
///
/// `floor(p / 100 * n) - 1`, clamped to `[0, n - 1]`. `p = 0` maps to the minimum and
/// `p = 100` to the maximum. Returns 0 when `n == 0`.
pub fn nearest_rank_index(p: f64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let rank = ((p / 100.0) * n as f64).floor() as i64 - 1;
    rank.clamp(0, n as i64 - 1) as usize
}

/// Concurrent append-only log of measurements with a lazily rebuilt sorted index.
pub struct PercentileStore {
    state: RwLock<StoreState>,
}

impl Default for PercentileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PercentileStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                measurements: Vec::new(),
                sorted: Vec::new(),
                dirty: false,
            }),
        }
    }

    /// Append a measurement and invalidate the sorted index.
    pub fn record(&self, timestamp: DateTime<Utc>, duration: Duration) {
        let mut state = self.state.write();
        state.measurements.push(Measurement { timestamp, duration });
        state.dirty = true;
    }

    /// Return the duration at percentile `p` using the nearest-rank method.
    ///
    /// An empty store yields [`QueryError::NoData`] for any `p`; only then is `p`
    /// checked against `[0, 100]`. A stale index is rebuilt first, so the answer always
    /// covers every measurement recorded before the call took its lock.
    pub fn query_percentile(&self, p: f64) -> Result<Duration, QueryError> {
        {
            let state = self.state.read();
            if state.measurements.is_empty() {
                return Err(QueryError::NoData);
            }
            if !is_valid_percentile(p) {
                return Err(QueryError::InvalidPercentile(p));
            }
            if !state.dirty {
                return Ok(state.value_at(p));
            }
        }

        let mut state = self.state.write();
        // Another query may have rebuilt while we waited for the write lock.
        if state.dirty {
            state.rebuild();
        }
        let state = RwLockWriteGuard::downgrade(state);
        Ok(state.value_at(p))
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        StoreStats {
            count: state.measurements.len(),
            index_valid: !state.dirty && state.sorted.len() == state.measurements.len(),
            index_size: state.sorted.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the measurement log in arrival order.
    pub fn measurements(&self) -> Vec<Measurement> {
        self.state.read().measurements.clone()
    }
}
