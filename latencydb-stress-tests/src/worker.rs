use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::{Duration, Instant};
use latencydb_client::{Client, ClientConfig};
use latencydb_common::LatencyDbError;

use crate::history::{History, OpKind, OpOutcome, OpRecord};
use crate::metrics::Metrics;
use crate::workload::{sample_percentile, Op, WorkloadProfile};

/// Drive the server at `base_url` with `profile` for `duration`, recording every operation.
/// Returns raw metrics and the full operation history for post-run correctness checking.
pub async fn run(
    base_url: String,
    profile: WorkloadProfile,
    max_duration_ms: u64,
    duration: Duration,
) -> (Metrics, History) {
    let client = Client::new(ClientConfig { base_url });
    let mut rng = StdRng::from_entropy();
    let mut records: Vec<OpRecord> = Vec::new();
    let mut requests_total: u64 = 0;
    let mut errors_5xx: u64 = 0;
    let mut latency_ns: Vec<u64> = Vec::new();

    let run_start = Instant::now();

    while run_start.elapsed() < duration {
        let op = profile.sample(&mut rng);

        let op_start = Instant::now();
        let (kind, outcome) = execute_op(&client, op, max_duration_ms, &mut rng).await;
        let op_end = Instant::now();

        if is_error(&outcome) {
            errors_5xx += 1;
        }

        requests_total += 1;
        latency_ns.push((op_end - op_start).as_nanos() as u64);
        records.push(OpRecord {
            client_start_ts: op_start,
            client_ack_ts: op_end,
            kind,
            outcome,
        });
    }

    let elapsed_secs = run_start.elapsed().as_secs_f64();
    let metrics = Metrics { requests_total, errors_5xx, latency_ns, elapsed_secs };
    (metrics, History(records))
}

async fn execute_op(
    client: &Client,
    op: Op,
    max_duration_ms: u64,
    rng: &mut impl Rng,
) -> (OpKind, OpOutcome) {
    match op {
        Op::Store => {
            let duration_ms = generate_duration_ms(rng, max_duration_ms);
            let outcome = match client.store_now(duration_ms as i64).await {
                Ok(()) => OpOutcome::StoreOk { duration_ms },
                Err(e) => outcome_for_error(&e),
            };
            (OpKind::Store, outcome)
        }
        Op::Query => {
            let p = sample_percentile(rng);
            let outcome = match client.percentile(p).await {
                Ok(r) => OpOutcome::QueryOk { percentile: p, response_time_ms: r.response_time_ms },
                Err(e) => outcome_for_error(&e),
            };
            (OpKind::Query, outcome)
        }
        Op::Stats => {
            let outcome = match client.stats().await {
                Ok(s) => OpOutcome::StatsOk { total_entries: s.total_entries },
                Err(e) => outcome_for_error(&e),
            };
            (OpKind::Stats, outcome)
        }
    }
}

/// Draw a response time in `0..=max_ms` milliseconds for a store operation.
pub fn generate_duration_ms(rng: &mut impl Rng, max_ms: u64) -> u64 {
    rng.gen_range(0..=max_ms)
}

/// Map a client error to the outcome recorded in the history.
pub fn outcome_for_error(err: &LatencyDbError) -> OpOutcome {
    match err {
        LatencyDbError::NoData => OpOutcome::NoData,
        LatencyDbError::NetworkError(_) => OpOutcome::Error,
        LatencyDbError::HttpError(status, _) if *status >= 500 => OpOutcome::Error,
        _ => OpOutcome::Rejected,
    }
}

/// Returns `true` if `outcome` represents a server-side error (5xx or network failure).
pub fn is_error(outcome: &OpOutcome) -> bool {
    matches!(outcome, OpOutcome::Error)
}
