use clap::Parser;
use latencydb_client::{Client, ClientConfig};
use latencydb_common::LatencyDbError;
use latencydb_stress_tests::history::{FinalSnapshot, History, ViolationKind};
use latencydb_stress_tests::metrics::Metrics;
use latencydb_stress_tests::server::ServerProcess;
use latencydb_stress_tests::workload::WorkloadProfile;
use latencydb_stress_tests::worker;
use std::io::Write;
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "latencydb-stress", about = "LatencyDB stress test harness")]
struct Args {
    /// How long to run (seconds)
    #[arg(long, default_value_t = 5)]
    duration: u64,

    /// Workload profile: read-heavy | balanced | write-heavy | store-only
    #[arg(long, default_value = "balanced")]
    workload: String,

    /// Number of concurrent client workers
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Largest response time (ms) a store operation sends
    #[arg(long, default_value_t = 10_000)]
    max_duration_ms: u64,

    /// Fail if the 5xx error rate exceeds this fraction
    #[arg(long, default_value_t = 0.01)]
    max_error_rate: f64,

    /// Fail if correctness violations exceed this count
    #[arg(long, default_value_t = 0)]
    max_violations: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let profile = WorkloadProfile::from_name(&args.workload).unwrap_or_else(|| {
        eprintln!(
            "Unknown workload {:?}. Valid values: read-heavy, balanced, write-heavy, store-only",
            args.workload
        );
        process::exit(3);
    });

    let server = ServerProcess::build_and_spawn().unwrap_or_else(|e| {
        eprintln!("Failed to start server: {e}");
        process::exit(3);
    });

    println!("Server ready:  {}", server.addr);

    let duration = Duration::from_secs(args.duration);

    print!("Running {}s {} workload with {} workers ", args.duration, profile.as_name(), args.concurrency);
    std::io::stdout().flush().ok();

    let dot_handle = tokio::spawn(async {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await; // consume the immediate first tick
        loop {
            interval.tick().await;
            print!(".");
            std::io::stdout().flush().ok();
        }
    });

    let workers: Vec<_> = (0..args.concurrency)
        .map(|_| tokio::spawn(worker::run(server.base_url(), profile, args.max_duration_ms, duration)))
        .collect();

    let mut parts = Vec::with_capacity(workers.len());
    let mut records = Vec::new();
    for handle in workers {
        match handle.await {
            Ok((metrics, history)) => {
                parts.push(metrics);
                records.extend(history.0);
            }
            Err(e) => {
                eprintln!("Worker panicked: {e}");
                drop(server);
                process::exit(3);
            }
        }
    }
    let metrics = Metrics::merge(parts);
    let history = History(records);

    dot_handle.abort();
    println!();

    let client = Client::new(ClientConfig { base_url: server.base_url() });
    let snapshot = match read_final_snapshot(&client).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read final server state: {e}");
            drop(server);
            process::exit(3);
        }
    };
    drop(server);

    let mut violations: Vec<ViolationKind> =
        history.check_correctness().into_iter().map(|v| v.kind).collect();
    violations.extend(history.check_final(snapshot));
    let violation_count = violations.len() as u64;

    print_report(&args, &metrics, &history, violation_count, profile);

    for v in &violations {
        eprintln!("VIOLATION {}", describe(v));
    }

    let error_rate_exceeded = metrics.requests_total > 0
        && metrics.error_rate() > args.max_error_rate;
    let violations_exceeded = violation_count > args.max_violations;

    let exit_code = if error_rate_exceeded {
        1
    } else if violations_exceeded {
        2
    } else {
        0
    };

    process::exit(exit_code);
}

async fn read_final_snapshot(client: &Client) -> Result<FinalSnapshot, LatencyDbError> {
    let max_ms = optional(client.percentile(100.0).await)?;
    let min_ms = optional(client.percentile(0.0).await)?;
    let stats = client.stats().await?;
    Ok(FinalSnapshot { max_ms, min_ms, total_entries: stats.total_entries })
}

fn optional(result: Result<latencydb_common::PercentileResponse, LatencyDbError>) -> Result<Option<u64>, LatencyDbError> {
    match result {
        Ok(r) => Ok(Some(r.response_time_ms)),
        Err(LatencyDbError::NoData) => Ok(None),
        Err(e) => Err(e),
    }
}

fn describe(kind: &ViolationKind) -> String {
    match kind {
        ViolationKind::ValueNotStored { percentile, actual } => {
            format!("ValueNotStored: p{percentile} returned {actual} ms, which was never stored")
        }
        ViolationKind::StaleMaximum { expected_at_least, actual } => {
            format!("StaleMaximum: p100 returned {actual} ms after {expected_at_least} ms was acked")
        }
        ViolationKind::StaleMinimum { expected_at_most, actual } => {
            format!("StaleMinimum: p0 returned {actual} ms after {expected_at_most} ms was acked")
        }
        ViolationKind::NoDataAfterStore => "NoDataAfterStore: empty dataset after an acked store".to_string(),
        ViolationKind::CountBehind { expected_at_least, actual } => {
            format!("CountBehind: stats reported {actual} entries, {expected_at_least} were acked")
        }
        ViolationKind::FinalMismatch { what, expected, actual } => {
            format!("FinalMismatch: {what} expected {expected}, got {actual}")
        }
    }
}

fn print_report(args: &Args, metrics: &Metrics, history: &History, violation_count: u64, profile: WorkloadProfile) {
    let pass_fail = |exceeded: bool| if exceeded { "✗" } else { "✓" };

    let error_rate_exceeded = metrics.requests_total > 0
        && metrics.error_rate() > args.max_error_rate;
    let violations_exceeded = violation_count > args.max_violations;
    let overall_pass = !error_rate_exceeded && !violations_exceeded;

    println!("LatencyDB Stress Test Results");
    println!("=============================");
    println!("Duration:              {:.1} s", args.duration as f64);
    println!("Workload:              {}", profile.as_name());
    println!("Workers:               {}", args.concurrency);
    println!();
    println!("Requests:              {}", format_thousands(metrics.requests_total));
    println!("Stores acked:          {}", format_thousands(history.acked_durations().len() as u64));
    println!("Throughput:            {:.1} rps", metrics.throughput_rps());
    println!("P50 latency:           {:.1} ms", ns_to_ms(metrics.p50_ns()));
    println!("P99 latency:           {:.1} ms", ns_to_ms(metrics.p99_ns()));
    println!();
    println!("5xx errors:            {}", format_thousands(metrics.errors_5xx));
    println!(
        "Error rate:            {:.3}%    [threshold: {:.3}%]  {}",
        metrics.error_rate() * 100.0,
        args.max_error_rate * 100.0,
        pass_fail(error_rate_exceeded),
    );
    println!();
    println!(
        "Correctness violations: {}        [threshold: {}]        {}",
        violation_count,
        args.max_violations,
        pass_fail(violations_exceeded),
    );
    println!();
    println!("Result: {}", if overall_pass { "PASS" } else { "FAIL" });
}

fn format_thousands(n: u64) -> String {
    if n >= 1_000_000 {
        format!("~{}M", n / 1_000_000)
    } else if n >= 1_000 {
        format!("~{}K", n / 1_000)
    } else {
        n.to_string()
    }
}

fn ns_to_ms(ns: u64) -> f64 {
    ns as f64 / 1_000_000.0
}
