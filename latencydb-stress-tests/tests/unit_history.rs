use std::time::{Duration, Instant};
use latencydb_stress_tests::history::{FinalSnapshot, History, OpKind, OpOutcome, OpRecord, ViolationKind};

fn store(duration_ms: u64, start: Instant, ack: Instant) -> OpRecord {
    OpRecord {
        client_start_ts: start,
        client_ack_ts: ack,
        kind: OpKind::Store,
        outcome: OpOutcome::StoreOk { duration_ms },
    }
}

fn failed_store(start: Instant, ack: Instant) -> OpRecord {
    OpRecord { client_start_ts: start, client_ack_ts: ack, kind: OpKind::Store, outcome: OpOutcome::Error }
}

fn query(percentile: f64, response_time_ms: u64, start: Instant, ack: Instant) -> OpRecord {
    OpRecord {
        client_start_ts: start,
        client_ack_ts: ack,
        kind: OpKind::Query,
        outcome: OpOutcome::QueryOk { percentile, response_time_ms },
    }
}

fn no_data(start: Instant, ack: Instant) -> OpRecord {
    OpRecord { client_start_ts: start, client_ack_ts: ack, kind: OpKind::Query, outcome: OpOutcome::NoData }
}

fn stats(total_entries: usize, start: Instant, ack: Instant) -> OpRecord {
    OpRecord {
        client_start_ts: start,
        client_ack_ts: ack,
        kind: OpKind::Stats,
        outcome: OpOutcome::StatsOk { total_entries },
    }
}

/// `n` instants one millisecond apart.
fn ticks<const N: usize>() -> [Instant; N] {
    let t0 = Instant::now();
    std::array::from_fn(|i| t0 + Duration::from_millis(i as u64))
}

// --- Basic ---

#[test]
fn test_empty_history_has_no_violations() {
    assert!(History(vec![]).check_correctness().is_empty());
}

#[test]
fn test_no_violations_when_reads_follow_stores() {
    let [t0, t1, t2, t3, t4, t5, t6, t7] = ticks::<8>();
    let h = History(vec![
        store(100, t0, t1),
        store(300, t1, t2),
        query(100.0, 300, t3, t4),
        query(0.0, 100, t4, t5),
        query(50.0, 100, t5, t6),
        stats(2, t6, t7),
    ]);
    assert!(h.check_correctness().is_empty());
}

// --- ValueNotStored ---

#[test]
fn test_value_never_stored() {
    let [t0, t1, t2, t3] = ticks::<4>();
    let h = History(vec![store(100, t0, t1), query(50.0, 999, t2, t3)]);
    let v = h.check_correctness();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].op_index, 1);
    assert_eq!(v[0].kind, ViolationKind::ValueNotStored { percentile: 50.0, actual: 999 });
}

#[test]
fn test_value_stored_only_after_query_acked() {
    let [t0, t1, t2, t3] = ticks::<4>();
    let h = History(vec![query(100.0, 7, t0, t1), store(7, t2, t3)]);
    let v = h.check_correctness();
    assert_eq!(v.len(), 1);
    assert!(matches!(v[0].kind, ViolationKind::ValueNotStored { actual: 7, .. }));
}

#[test]
fn test_overlapping_store_and_query_is_not_a_violation() {
    // Store in flight while the query runs: seeing it or not are both fine.
    let [t0, t1, t2, t3] = ticks::<4>();
    let h = History(vec![
        store(10, t0, t1),
        store(50, t1, t3),
        query(100.0, 50, t2, t3),
        query(100.0, 10, t2, t3),
    ]);
    assert!(h.check_correctness().is_empty());
}

// --- Extremes ---

#[test]
fn test_stale_maximum() {
    let [t0, t1, t2, t3, t4] = ticks::<5>();
    let h = History(vec![store(10, t0, t1), store(50, t1, t2), query(100.0, 10, t3, t4)]);
    let v = h.check_correctness();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].kind, ViolationKind::StaleMaximum { expected_at_least: 50, actual: 10 });
}

#[test]
fn test_stale_minimum() {
    let [t0, t1, t2, t3, t4] = ticks::<5>();
    let h = History(vec![store(50, t0, t1), store(10, t1, t2), query(0.0, 50, t3, t4)]);
    let v = h.check_correctness();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].kind, ViolationKind::StaleMinimum { expected_at_most: 10, actual: 50 });
}

#[test]
fn test_interior_percentiles_are_not_range_checked() {
    let [t0, t1, t2, t3, t4] = ticks::<5>();
    let h = History(vec![store(10, t0, t1), store(50, t1, t2), query(90.0, 10, t3, t4)]);
    assert!(h.check_correctness().is_empty());
}

// --- NoData / stats ---

#[test]
fn test_no_data_after_acked_store() {
    let [t0, t1, t2, t3] = ticks::<4>();
    let h = History(vec![store(1, t0, t1), no_data(t2, t3)]);
    let v = h.check_correctness();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].kind, ViolationKind::NoDataAfterStore);
}

#[test]
fn test_no_data_before_any_store_is_fine() {
    let [t0, t1, t2, t3] = ticks::<4>();
    let h = History(vec![no_data(t0, t1), store(1, t2, t3)]);
    assert!(h.check_correctness().is_empty());
}

#[test]
fn test_stats_count_behind() {
    let [t0, t1, t2, t3, t4] = ticks::<5>();
    let h = History(vec![store(1, t0, t1), store(2, t1, t2), stats(1, t3, t4)]);
    let v = h.check_correctness();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].kind, ViolationKind::CountBehind { expected_at_least: 2, actual: 1 });
}

#[test]
fn test_stats_may_count_in_flight_stores() {
    let [t0, t1, t2, t3] = ticks::<4>();
    let h = History(vec![store(1, t0, t1), store(2, t1, t3), stats(2, t2, t3)]);
    assert!(h.check_correctness().is_empty());
}

// --- Final snapshot ---

#[test]
fn test_check_final_matches() {
    let [t0, t1, t2] = ticks::<3>();
    let h = History(vec![store(30, t0, t1), store(5, t1, t2)]);
    let snapshot = FinalSnapshot { max_ms: Some(30), min_ms: Some(5), total_entries: 2 };
    assert!(h.check_final(snapshot).is_empty());
}

#[test]
fn test_check_final_detects_wrong_extremes_and_count() {
    let [t0, t1, t2] = ticks::<3>();
    let h = History(vec![store(30, t0, t1), store(5, t1, t2)]);
    let snapshot = FinalSnapshot { max_ms: Some(29), min_ms: Some(6), total_entries: 1 };
    let v = h.check_final(snapshot);
    assert_eq!(
        v,
        vec![
            ViolationKind::FinalMismatch { what: "p100", expected: 30, actual: 29 },
            ViolationKind::FinalMismatch { what: "p0", expected: 5, actual: 6 },
            ViolationKind::FinalMismatch { what: "total_entries", expected: 2, actual: 1 },
        ]
    );
}

#[test]
fn test_check_final_no_data_after_stores() {
    let [t0, t1] = ticks::<2>();
    let h = History(vec![store(30, t0, t1)]);
    let snapshot = FinalSnapshot { max_ms: None, min_ms: None, total_entries: 0 };
    let v = h.check_final(snapshot);
    assert_eq!(v.iter().filter(|k| **k == ViolationKind::NoDataAfterStore).count(), 2);
}

#[test]
fn test_check_final_tolerates_failed_stores_landing() {
    let [t0, t1, t2] = ticks::<3>();
    let h = History(vec![store(30, t0, t1), failed_store(t1, t2)]);

    // The failed store may have recorded a larger value and a second entry.
    let landed = FinalSnapshot { max_ms: Some(80), min_ms: Some(30), total_entries: 2 };
    assert!(h.check_final(landed).is_empty());

    let lost = FinalSnapshot { max_ms: Some(30), min_ms: Some(30), total_entries: 1 };
    assert!(h.check_final(lost).is_empty());

    let shrunk = FinalSnapshot { max_ms: Some(20), min_ms: Some(30), total_entries: 1 };
    assert_eq!(
        h.check_final(shrunk),
        vec![ViolationKind::FinalMismatch { what: "p100", expected: 30, actual: 20 }]
    );
}

#[test]
fn test_acked_durations_and_failed_stores() {
    let [t0, t1, t2, t3] = ticks::<4>();
    let h = History(vec![store(3, t0, t1), failed_store(t1, t2), store(1, t2, t3), no_data(t0, t1)]);
    assert_eq!(h.acked_durations(), vec![3, 1]);
    assert_eq!(h.failed_stores(), 1);
}

#[test]
fn test_rejected_stores_count_as_failed() {
    let [t0, t1, t2] = ticks::<3>();
    let rejected = OpRecord { client_start_ts: t0, client_ack_ts: t1, kind: OpKind::Store, outcome: OpOutcome::Rejected };
    let h = History(vec![rejected, store(4, t1, t2)]);
    assert_eq!(h.acked_durations(), vec![4]);
    assert_eq!(h.failed_stores(), 1);
}
