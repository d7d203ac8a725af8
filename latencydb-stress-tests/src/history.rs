use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Store,
    Query,
    Stats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OpOutcome {
    /// The store was acknowledged. `duration_ms` is what was written.
    StoreOk { duration_ms: u64 },
    QueryOk { percentile: f64, response_time_ms: u64 },
    /// The server reported an empty dataset.
    NoData,
    StatsOk { total_entries: usize },
    /// 5xx or network failure.
    Error,
    /// 4xx, or a reply that could not be decoded.
    Rejected,
}

pub struct OpRecord {
    /// When the client sent the request.
    pub client_start_ts: Instant,
    /// When the client received the response (the ACK).
    pub client_ack_ts: Instant,
    pub kind: OpKind,
    pub outcome: OpOutcome,
}

pub struct History(pub Vec<OpRecord>);

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    /// A query returned a duration that no store had even started sending by the time the
    /// query was acknowledged.
    ValueNotStored { percentile: f64, actual: u64 },
    /// `p = 100` returned less than a duration whose store was acked before the query started.
    StaleMaximum { expected_at_least: u64, actual: u64 },
    /// `p = 0` returned more than a duration whose store was acked before the query started.
    StaleMinimum { expected_at_most: u64, actual: u64 },
    /// The server reported no data although a store was acked before the query started.
    NoDataAfterStore,
    /// Stats counted fewer entries than were acked before the stats call started.
    CountBehind { expected_at_least: usize, actual: usize },
    /// A post-run read disagreed with the complete set of acknowledged stores.
    FinalMismatch { what: &'static str, expected: u64, actual: u64 },
}

/// Server state read once every worker has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalSnapshot {
    pub max_ms: Option<u64>,
    pub min_ms: Option<u64>,
    pub total_entries: usize,
}

pub struct Violation {
    /// Index of the offending operation in the history.
    pub op_index: usize,
    pub kind: ViolationKind,
}

/// A store as seen from the client: its value and its request window.
struct StoreEntry {
    duration_ms: u64,
    start_ts: Instant,
    ack_ts: Instant,
}

impl History {
    /// Check every successful read against the stores that had definitely completed
    /// before it began, and against the stores that could possibly have reached the server.
    pub fn check_correctness(&self) -> Vec<Violation> {
        let stores = build_store_index(&self.0);

        self.0
            .iter()
            .enumerate()
            .filter_map(|(op_index, r)| {
                classify_read(r, &stores).map(|kind| Violation { op_index, kind })
            })
            .collect()
    }

    /// Compare the quiesced server against every acknowledged store.
    ///
    /// Stores that failed may or may not have landed, so exact agreement is only
    /// required when none failed.
    pub fn check_final(&self, snapshot: FinalSnapshot) -> Vec<ViolationKind> {
        let acked = self.acked_durations();
        let failed = self.failed_stores();
        let mut violations = Vec::new();

        // A failed store may still have landed, widening the extremes outward only.
        let checks: [(&'static str, Option<u64>, Option<u64>, fn(u64, u64) -> bool); 2] = [
            ("p100", acked.iter().copied().max(), snapshot.max_ms, |e, a| a >= e),
            ("p0", acked.iter().copied().min(), snapshot.min_ms, |e, a| a <= e),
        ];
        for (what, expected, actual, widened_ok) in checks {
            match (expected, actual) {
                (Some(e), Some(a)) if a != e && (failed == 0 || !widened_ok(e, a)) => {
                    violations.push(ViolationKind::FinalMismatch { what, expected: e, actual: a });
                }
                (Some(_), None) => violations.push(ViolationKind::NoDataAfterStore),
                _ => {}
            }
        }

        let count_ok = if failed == 0 {
            snapshot.total_entries == acked.len()
        } else {
            (acked.len()..=acked.len() + failed).contains(&snapshot.total_entries)
        };
        if !count_ok {
            violations.push(ViolationKind::FinalMismatch {
                what: "total_entries",
                expected: acked.len() as u64,
                actual: snapshot.total_entries as u64,
            });
        }

        violations
    }

    /// Durations of every acknowledged store, in history order.
    pub fn acked_durations(&self) -> Vec<u64> {
        self.0
            .iter()
            .filter_map(|r| match r.outcome {
                OpOutcome::StoreOk { duration_ms } => Some(duration_ms),
                _ => None,
            })
            .collect()
    }

    /// Number of stores that were not acknowledged; their effect on the server is unknown.
    pub fn failed_stores(&self) -> usize {
        self.0
            .iter()
            .filter(|r| r.kind == OpKind::Store && !matches!(r.outcome, OpOutcome::StoreOk { .. }))
            .count()
    }
}

fn build_store_index(records: &[OpRecord]) -> Vec<StoreEntry> {
    records
        .iter()
        .filter_map(|r| match r.outcome {
            OpOutcome::StoreOk { duration_ms } => Some(StoreEntry {
                duration_ms,
                start_ts: r.client_start_ts,
                ack_ts: r.client_ack_ts,
            }),
            _ => None,
        })
        .collect()
}

/// Stores whose ACK arrived no later than `start`.
fn acked_before(stores: &[StoreEntry], start: Instant) -> impl Iterator<Item = &StoreEntry> {
    stores.iter().filter(move |s| s.ack_ts <= start)
}

/// Returns the violation kind for a single read, or `None` if it is consistent.
fn classify_read(record: &OpRecord, stores: &[StoreEntry]) -> Option<ViolationKind> {
    let start = record.client_start_ts;
    let ack = record.client_ack_ts;

    match record.outcome {
        OpOutcome::QueryOk { percentile, response_time_ms } => {
            // 1. Nothing with this value could have reached the server yet.
            let possible = stores
                .iter()
                .any(|s| s.duration_ms == response_time_ms && s.start_ts <= ack);
            if !possible {
                return Some(ViolationKind::ValueNotStored { percentile, actual: response_time_ms });
            }

            // 2. Extremes must cover every store that finished before the query began.
            if percentile >= 100.0 {
                if let Some(floor) = acked_before(stores, start).map(|s| s.duration_ms).max() {
                    if response_time_ms < floor {
                        return Some(ViolationKind::StaleMaximum {
                            expected_at_least: floor,
                            actual: response_time_ms,
                        });
                    }
                }
            }
            if percentile <= 0.0 {
                if let Some(ceiling) = acked_before(stores, start).map(|s| s.duration_ms).min() {
                    if response_time_ms > ceiling {
                        return Some(ViolationKind::StaleMinimum {
                            expected_at_most: ceiling,
                            actual: response_time_ms,
                        });
                    }
                }
            }
            None
        }
        OpOutcome::NoData if record.kind == OpKind::Query => {
            acked_before(stores, start).next().map(|_| ViolationKind::NoDataAfterStore)
        }
        OpOutcome::StatsOk { total_entries } => {
            let expected = acked_before(stores, start).count();
            (total_entries < expected).then_some(ViolationKind::CountBehind {
                expected_at_least: expected,
                actual: total_entries,
            })
        }
        _ => None,
    }
}
