use latencydb_common::{
    is_valid_percentile, PercentileResponse, StatsResponse, StoreRequest, MAX_PERCENTILE,
    MIN_PERCENTILE,
};

#[test]
fn test_percentile_bounds_inclusive() {
    assert!(is_valid_percentile(MIN_PERCENTILE));
    assert!(is_valid_percentile(MAX_PERCENTILE));
    assert!(is_valid_percentile(99.9));
    assert!(!is_valid_percentile(-0.001));
    assert!(!is_valid_percentile(100.001));
    assert!(!is_valid_percentile(f64::NAN));
    assert!(!is_valid_percentile(f64::INFINITY));
}

#[test]
fn test_store_request_field_names() {
    let json = r#"{"timestamp":"2024-01-15T10:30:00Z","duration_ms":150}"#;
    let parsed: StoreRequest = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.timestamp, "2024-01-15T10:30:00Z");
    assert_eq!(parsed.duration_ms, 150);
}

#[test]
fn test_store_request_missing_duration_is_rejected() {
    let json = r#"{"timestamp":"2024-01-15T10:30:00Z"}"#;
    assert!(serde_json::from_str::<StoreRequest>(json).is_err());
}

#[test]
fn test_percentile_response_shape() {
    let body = PercentileResponse { percentile: 90.0, response_time_ms: 200 };
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value["percentile"], 90.0);
    assert_eq!(value["response_time_ms"], 200);
}

#[test]
fn test_stats_response_shape() {
    let json = r#"{"total_entries":100,"cache_valid":true,"cache_size":100}"#;
    let parsed: StatsResponse = serde_json::from_str(json).unwrap();
    assert_eq!(parsed, StatsResponse { total_entries: 100, cache_valid: true, cache_size: 100 });
}
