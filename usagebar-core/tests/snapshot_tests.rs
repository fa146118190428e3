//! Integration tests for core snapshot types.

use usagebar_core::{ErrorCategory, ErrorState, UsageLimit, UsageSnapshot};

#[test]
fn test_snapshot_serialization_roundtrip() {
    let snapshot = UsageSnapshot {
        five_hour: Some(UsageLimit::new(12.0, "2025-01-01T05:00:00Z")),
        ..UsageSnapshot::default()
    };
    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: UsageSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, snapshot);
    assert!(parsed.has_data());
}

#[test]
fn test_empty_snapshot_has_no_data() {
    let parsed: UsageSnapshot = serde_json::from_str("{}").unwrap();
    assert!(!parsed.has_data());
    assert!(parsed.max_utilization().is_none());
}

#[test]
fn test_usage_limit_validation() {
    let mut snapshot = UsageSnapshot {
        seven_day: Some(UsageLimit::new(50.0, "2025-01-05T00:00:00Z")),
        ..UsageSnapshot::default()
    };
    assert!(snapshot.validate().is_ok());

    snapshot.seven_day = Some(UsageLimit::new(-10.0, "2025-01-05T00:00:00Z"));
    assert!(snapshot.validate().is_ok());

    snapshot.seven_day = Some(UsageLimit::new(f64::INFINITY, "2025-01-05T00:00:00Z"));
    let err = snapshot.validate().unwrap_err();
    assert!(err.to_string().contains("Weekly"));
}

#[test]
fn test_error_state_is_plain_data() {
    let state = ErrorState::new(ErrorCategory::Server, "Server error (502). Try again later.", true, None);
    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json["category"], "server");
    assert_eq!(json["recoverable"], true);
}
