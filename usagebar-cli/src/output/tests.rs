//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::{TextFormatter, format_reset_time};
    use chrono::{Duration, TimeZone, Utc};
    use std::path::PathBuf;
    use std::sync::Arc;
    use usagebar_anthropic::{CredentialDiagnosis, CredentialError, CredentialSource, OAuthCredentials};
    use usagebar_core::{
        Account, ErrorCategory, ErrorState, Organization, ProfileSnapshot, UsageLimit,
        UsageSnapshot,
    };
    use usagebar_store::DashboardState;

    fn snapshot() -> UsageSnapshot {
        UsageSnapshot {
            five_hour: Some(UsageLimit::new(25.0, "2025-01-01T05:00:00Z")),
            seven_day: Some(UsageLimit::new(50.0, "2025-01-05T00:00:00Z")),
            seven_day_opus: Some(UsageLimit::new(90.0, "not a timestamp")),
            ..UsageSnapshot::default()
        }
    }

    #[test]
    fn test_progress_bar_boundary_values() {
        let formatter = TextFormatter::new(false);

        let test_cases = vec![
            (0.0, "░░░░░░░░░░"),
            (10.0, "█░░░░░░░░░"),
            (25.0, "███░░░░░░░"), // 2.5 rounds to 3 blocks
            (50.0, "█████░░░░░"),
            (75.0, "████████░░"), // 7.5 rounds to 8 blocks
            (100.0, "██████████"),
        ];

        for (percent, expected) in test_cases {
            let bar = formatter.progress_bar(percent);
            assert_eq!(bar, expected, "Failed for {percent}%");
        }
    }

    #[test]
    fn test_progress_bar_clamps_out_of_range() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.progress_bar(-20.0), "░░░░░░░░░░");
        assert_eq!(formatter.progress_bar(140.0), "██████████");
    }

    #[test]
    fn test_progress_bar_with_colors() {
        let formatter = TextFormatter::new(true);

        assert!(formatter.progress_bar(10.0).contains("\x1b[31m"), "red below 20%");
        assert!(formatter.progress_bar(40.0).contains("\x1b[33m"), "yellow below 50%");
        assert!(formatter.progress_bar(80.0).contains("\x1b[32m"), "green otherwise");
    }

    #[test]
    fn test_format_usage_lists_present_windows() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_usage(&snapshot());

        assert!(output.contains("Session (5h):"));
        assert!(output.contains("75% left"));
        assert!(output.contains("Weekly:"));
        assert!(output.contains("50% left"));
        assert!(output.contains("Weekly Opus:"));
        assert!(output.contains("10% left"));
        assert!(!output.contains("Weekly Sonnet"));
        // Unparseable reset strings pass through untouched.
        assert!(output.contains("Resets not a timestamp"));
    }

    #[test]
    fn test_format_usage_empty() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_usage(&UsageSnapshot::default());
        assert_eq!(output, "No usage data reported");
    }

    #[test]
    fn test_format_window_marks_exhausted() {
        let formatter = TextFormatter::new(false);
        let limit = UsageLimit::new(104.0, "2025-01-01T05:00:00Z");
        let output = formatter.format_window(&limit, "Session (5h)", Utc::now());
        assert!(output.contains("0% left"));
        assert!(output.contains("(limit reached)"));
    }

    #[test]
    fn test_format_reset_time() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();

        assert_eq!(format_reset_time(now - Duration::minutes(5), now), "now");
        assert_eq!(format_reset_time(now + Duration::minutes(1), now), "in 1 minute");
        assert_eq!(format_reset_time(now + Duration::minutes(30), now), "in 30 minutes");
        assert_eq!(format_reset_time(now + Duration::hours(2), now), "in 2 hours");
        assert_eq!(
            format_reset_time(now + Duration::minutes(90), now),
            "in 1h 30m"
        );
        assert!(format_reset_time(now + Duration::days(3), now).contains(" at "));
    }

    #[test]
    fn test_format_profile() {
        let formatter = TextFormatter::new(false);
        let profile = ProfileSnapshot {
            account: Some(Account {
                display_name: Some("Ada".to_string()),
                email: Some("ada@example.com".to_string()),
                has_max_plan: Some(true),
                ..Account::default()
            }),
            organization: Some(Organization {
                name: Some("Analytical Engines".to_string()),
                ..Organization::default()
            }),
        };

        let output = formatter.format_profile(&profile);
        assert!(output.contains("Account: Ada"));
        assert!(output.contains("Email:   ada@example.com"));
        assert!(output.contains("Plan:    Max"));
        assert!(output.contains("Org:     Analytical Engines"));
    }

    #[test]
    fn test_format_error_includes_hint() {
        let formatter = TextFormatter::new(false);
        let state = ErrorState::new(
            ErrorCategory::Authentication,
            "Session expired. Start Claude to refresh",
            false,
            Some("Run: claude login"),
        );

        let output = formatter.format_error(&state);
        assert!(output.starts_with("Authentication: Session expired"));
        assert!(output.contains("Run: claude login"));
    }

    #[test]
    fn test_format_dashboard_states() {
        let formatter = TextFormatter::new(false);

        let loading = DashboardState {
            is_loading: true,
            auto_refresh_active: true,
            ..DashboardState::default()
        };
        let output = formatter.format_dashboard(&loading);
        assert!(output.contains("Loading..."));
        assert!(output.contains("never updated"));
        assert!(!output.contains("[resume]"));

        let paused = DashboardState {
            usage: Some(Arc::new(snapshot())),
            error: Some(ErrorState::new(ErrorCategory::Server, "Server error (503). Try again later.", true, None)),
            consecutive_failures: 5,
            auto_refresh_active: false,
            last_updated: Some(Utc::now()),
            ..DashboardState::default()
        };
        let output = formatter.format_dashboard(&paused);
        assert!(output.contains("75% left"));
        assert!(output.contains("Server: Server error (503)"));
        assert!(output.contains("auto-refresh paused"));
        assert!(output.contains("5 failed in a row"));
        assert!(output.contains("[resume]"));
    }

    #[test]
    fn test_format_diagnosis() {
        let formatter = TextFormatter::new(false);
        let diagnosis = CredentialDiagnosis {
            file_path: PathBuf::from("/home/ada/.claude/.credentials.json"),
            file: Err(CredentialError::FileNotFound(PathBuf::from(
                "/home/ada/.claude/.credentials.json",
            ))),
            secret_store: Ok(OAuthCredentials {
                access_token: "sk-ant-oat01-secret".to_string(),
                refresh_token: None,
                expires_at_ms: Some(Utc::now().timestamp_millis() + 3_600_000),
                scopes: vec![],
                subscription_type: Some("pro".to_string()),
                rate_limit_tier: None,
                source: CredentialSource::KeychainCommand,
            }),
        };

        let output = formatter.format_diagnosis(&diagnosis);
        assert!(output.contains("✗ File (/home/ada/.claude/.credentials.json)"));
        assert!(output.contains("✓ Secret store: valid until"));
        assert!(output.contains("plan pro"));
        assert!(!output.contains("sk-ant-oat01-secret"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::{
        AuthStatusOutput, DashboardOutput, ErrorOutput, JsonFormatter, UsageReport,
    };
    use std::path::PathBuf;
    use std::sync::Arc;
    use usagebar_anthropic::{CredentialDiagnosis, CredentialError, CredentialSource, OAuthCredentials};
    use usagebar_core::{ErrorCategory, ErrorState, UsageLimit, UsageSnapshot};
    use usagebar_store::DashboardState;

    #[test]
    fn test_format_pretty_json() {
        let formatter = JsonFormatter::new(true);
        let output = formatter.format(&serde_json::json!({"key": "value"})).unwrap();
        assert!(output.contains('\n'));
        assert!(output.contains("  "));
    }

    #[test]
    fn test_format_compact_json() {
        let formatter = JsonFormatter::new(false);
        let output = formatter.format(&serde_json::json!({"key": "value"})).unwrap();
        assert_eq!(output, r#"{"key":"value"}"#);
    }

    #[test]
    fn test_usage_report_keeps_wire_shape() {
        let usage = UsageSnapshot {
            five_hour: Some(UsageLimit::new(42.5, "2025-01-01T05:00:00.123456+00:00")),
            ..UsageSnapshot::default()
        };

        let output = JsonFormatter::new(false)
            .format(&UsageReport::new(&usage, None))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["usage"]["five_hour"]["utilization"], 42.5);
        assert_eq!(
            parsed["usage"]["five_hour"]["resets_at"],
            "2025-01-01T05:00:00.123456+00:00"
        );
        assert_eq!(parsed["maxUtilization"], 42.5);
        assert!(parsed.get("profile").is_none());
        assert!(parsed["fetchedAt"].is_string());
    }

    #[test]
    fn test_dashboard_output() {
        let state = DashboardState {
            usage: Some(Arc::new(UsageSnapshot::default())),
            error: Some(ErrorState::new(ErrorCategory::RateLimit, "Rate limited. Please wait.", true, None)),
            consecutive_failures: 2,
            auto_refresh_active: true,
            ..DashboardState::default()
        };

        let output = JsonFormatter::new(false)
            .format(&DashboardOutput::from(&state))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["error"]["category"], "rate_limit");
        assert_eq!(parsed["consecutiveFailures"], 2);
        assert_eq!(parsed["autoRefreshActive"], true);
        assert_eq!(parsed["isLoading"], false);
        assert!(parsed.get("lastUpdated").is_none());
    }

    #[test]
    fn test_error_output() {
        let state = ErrorState::new(
            ErrorCategory::Authentication,
            "No credentials found. Start Claude to login",
            false,
            Some("Run: claude login"),
        );

        let output = JsonFormatter::new(false)
            .format(&ErrorOutput::from(&state))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["category"], "authentication");
        assert_eq!(parsed["recoverable"], false);
        assert_eq!(parsed["hint"], "Run: claude login");
    }

    #[test]
    fn test_auth_status_never_leaks_tokens() {
        let diagnosis = CredentialDiagnosis {
            file_path: PathBuf::from("/tmp/.credentials.json"),
            file: Ok(OAuthCredentials {
                access_token: "sk-ant-oat01-secret".to_string(),
                refresh_token: Some("sk-ant-ort01-secret".to_string()),
                expires_at_ms: Some(1),
                scopes: vec!["user:profile".to_string()],
                subscription_type: Some("max".to_string()),
                rate_limit_tier: None,
                source: CredentialSource::File,
            }),
            secret_store: Err(CredentialError::SecretStoreDisabled),
        };

        let output = JsonFormatter::new(false)
            .format(&AuthStatusOutput::from(&diagnosis))
            .unwrap();
        assert!(!output.contains("sk-ant"));

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["file"]["available"], true);
        assert_eq!(parsed["file"]["expired"], true);
        assert_eq!(parsed["file"]["hasRefreshToken"], true);
        assert_eq!(parsed["secretStore"]["available"], false);
        assert_eq!(parsed["secretStore"]["error"], "Secret store lookup disabled");
    }
}
