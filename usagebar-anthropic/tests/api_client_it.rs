//! API client behaviour against a mock server.

use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use usagebar_anthropic::{
    ApiClient, ApiConfig, ApiError, CredentialResolver, ResolverConfig, SecretStore,
};
use usagebar_core::ErrorCategory;
use usagebar_fetch::RetryPolicy;

const TOKEN: &str = "sk-ant-oat01-test";
const FUTURE_MS: i64 = 4_102_444_800_000; // 2100-01-01

struct Fixture {
    _dir: TempDir,
    client: ApiClient,
}

fn credentials_doc(expires_at: i64) -> String {
    json!({
        "claudeAiOauth": {
            "accessToken": TOKEN,
            "refreshToken": "rt-test",
            "expiresAt": expires_at,
            "scopes": ["user:inference", "user:profile"]
        }
    })
    .to_string()
}

fn fixture_with(base_url: &str, credentials: Option<&str>) -> Fixture {
    fixture_with_retry(
        base_url,
        credentials,
        RetryPolicy::new(3).with_base_delay(Duration::from_millis(10)),
    )
}

fn fixture_with_retry(base_url: &str, credentials: Option<&str>, retry: RetryPolicy) -> Fixture {
    let dir = TempDir::new().expect("temp dir should be created");
    let path = dir.path().join(".credentials.json");
    if let Some(content) = credentials {
        std::fs::write(&path, content).expect("credentials should be written");
    }

    let resolver = Arc::new(CredentialResolver::new(ResolverConfig {
        credentials_path: path,
        secret_store: SecretStore::Disabled,
        cache_ttl: Duration::from_secs(60),
    }));
    let config = ApiConfig {
        base_url: base_url.to_string(),
        retry,
        ..ApiConfig::default()
    };
    let client = ApiClient::new(config, resolver).expect("client should build");

    Fixture { _dir: dir, client }
}

fn fixture(server: &MockServer) -> Fixture {
    fixture_with(&server.base_url(), Some(&credentials_doc(FUTURE_MS)))
}

#[tokio::test]
async fn usage_success_sends_oauth_headers_and_decodes() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/oauth/usage")
                .header("authorization", format!("Bearer {TOKEN}"))
                .header("anthropic-beta", "oauth-2025-04-20")
                .header("user-agent", "claude-code/2.1.7")
                .header("content-type", "application/json");
            then.status(200).json_body(json!({
                "five_hour": {"utilization": 42.5, "resets_at": "2025-01-01T00:00:00Z"},
                "seven_day": {"utilization": 10.0, "resets_at": null},
                "seven_day_sonnet": null,
                "extra_usage": {"is_enabled": false}
            }));
        })
        .await;
    let fx = fixture(&server);

    let usage = fx.client.fetch_usage().await.expect("usage should decode");

    mock.assert_calls_async(1).await;
    let five_hour = usage.five_hour.expect("five hour window should be present");
    assert!((five_hour.utilization_percent - 42.5).abs() < f64::EPSILON);
    assert_eq!(five_hour.resets_at.as_deref(), Some("2025-01-01T00:00:00Z"));
    assert!(usage.seven_day.expect("seven day window").resets_at.is_none());
    assert!(usage.seven_day_sonnet.is_none());
}

#[tokio::test]
async fn profile_success_decodes() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/oauth/profile");
            then.status(200).json_body(json!({
                "account": {
                    "uuid": "acc-1",
                    "display_name": "Ada",
                    "email": "ada@example.com",
                    "has_claude_max": true,
                    "has_claude_pro": false
                },
                "organization": {
                    "uuid": "org-1",
                    "name": "Analytical Engines",
                    "organization_type": "claude_max",
                    "rate_limit_tier": "default_claude_max_20x"
                }
            }));
        })
        .await;
    let fx = fixture(&server);

    let profile = fx.client.fetch_profile().await.expect("profile should decode");

    mock.assert_calls_async(1).await;
    assert_eq!(profile.display_name(), Some("Ada"));
    let account = profile.account.expect("account should be present");
    assert_eq!(account.plan_label(), "Max");
    let org = profile.organization.expect("organization should be present");
    assert_eq!(org.rate_limit_tier.as_deref(), Some("default_claude_max_20x"));
}

#[tokio::test]
async fn server_error_twice_then_success_returns_payload() {
    let server = MockServer::start_async().await;
    let mut failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/oauth/usage");
            then.status(503);
        })
        .await;
    // Attempt 3 waits 2 x 150ms, long enough to swap the mocks.
    let fx = fixture_with_retry(
        &server.base_url(),
        Some(&credentials_doc(FUTURE_MS)),
        RetryPolicy::new(3).with_base_delay(Duration::from_millis(150)),
    );

    let recover = async {
        let mut failed = failing.calls_async().await;
        while failed < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            failed = failing.calls_async().await;
        }
        failing.delete_async().await;
        let succeeding = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/oauth/usage");
                then.status(200).json_body(json!({
                    "five_hour": {"utilization": 61.0, "resets_at": "2025-01-01T05:00:00Z"}
                }));
            })
            .await;
        (failed, succeeding)
    };

    let (result, (failed, succeeding)) = tokio::join!(fx.client.fetch_usage(), recover);
    assert_eq!(failed, 2);

    let usage = result.expect("third attempt should succeed");
    let five_hour = usage.five_hour.expect("five hour window should be present");
    assert!((five_hour.utilization_percent - 61.0).abs() < f64::EPSILON);
    assert_eq!(five_hour.resets_at.as_deref(), Some("2025-01-01T05:00:00Z"));
    succeeding.assert_calls_async(1).await;
}

#[tokio::test]
async fn server_error_is_retried_until_budget_is_spent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/oauth/usage");
            then.status(503);
        })
        .await;
    let fx = fixture(&server);

    let err = fx.client.fetch_usage().await.unwrap_err();

    assert_eq!(err, ApiError::ServerError(503));
    mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn rate_limit_fails_on_first_attempt() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/oauth/usage");
            then.status(429);
        })
        .await;
    let fx = fixture(&server);

    let err = fx.client.fetch_usage().await.unwrap_err();

    assert_eq!(err, ApiError::RateLimited);
    mock.assert_calls_async(1).await;

    let state = err.to_error_state().expect("rate limit is user-visible");
    assert_eq!(state.category, ErrorCategory::RateLimit);
    assert!(state.recoverable);
    assert_eq!(state.action_hint.as_deref(), Some("Please wait a moment"));
}

#[tokio::test]
async fn non_retryable_statuses_make_one_attempt() {
    let cases = [
        (401, ApiError::TokenExpired),
        (403, ApiError::Forbidden),
        (404, ApiError::NotFound),
        (
            400,
            ApiError::ClientError {
                status: 400,
                message: Some("bad beta header".to_string()),
            },
        ),
    ];

    for (status, expected) in cases {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/oauth/profile");
                then.status(status).json_body(json!({
                    "type": "error",
                    "error": {"type": "invalid_request_error", "message": "bad beta header"}
                }));
            })
            .await;
        let fx = fixture(&server);

        let err = fx.client.fetch_profile().await.unwrap_err();

        assert_eq!(err, expected, "status {status}");
        mock.assert_calls_async(1).await;
    }
}

#[tokio::test]
async fn malformed_body_is_a_decoding_error() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/oauth/usage");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;
    let fx = fixture(&server);

    let err = fx.client.fetch_usage().await.unwrap_err();

    assert!(matches!(err, ApiError::DecodingError(_)));
    mock.assert_calls_async(1).await;
    assert_eq!(
        err.to_error_state().expect("decode errors are visible").category,
        ErrorCategory::Unknown
    );
}

#[tokio::test]
async fn negative_utilization_is_kept_and_clamped() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/oauth/usage");
            then.status(200)
                .json_body(json!({"five_hour": {"utilization": -3.0, "resets_at": null}}));
        })
        .await;
    let fx = fixture(&server);

    let usage = fx.client.fetch_usage().await.unwrap();
    let session = usage.five_hour.unwrap();
    assert!((session.utilization_percent + 3.0).abs() < f64::EPSILON);
    assert!((session.remaining_percent() - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn expired_token_fails_without_a_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.any_request();
            then.status(200).json_body(json!({}));
        })
        .await;
    let fx = fixture_with(&server.base_url(), Some(&credentials_doc(1_000)));

    let err = fx.client.fetch_usage().await.unwrap_err();

    assert_eq!(err, ApiError::TokenExpired);
    mock.assert_calls_async(0).await;
    let state = err.to_error_state().expect("auth errors are visible");
    assert_eq!(state.category, ErrorCategory::Authentication);
    assert!(!state.recoverable);
}

#[tokio::test]
async fn missing_and_corrupt_credentials_are_distinguished() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.any_request();
            then.status(200).json_body(json!({}));
        })
        .await;

    let absent = fixture_with(&server.base_url(), None);
    let err = absent.client.fetch_usage().await.unwrap_err();
    assert_eq!(err, ApiError::NoToken);
    let state = err.to_error_state().expect("auth errors are visible");
    assert_eq!(state.category, ErrorCategory::Authentication);
    assert!(!state.recoverable);

    let corrupt = fixture_with(&server.base_url(), Some("{\"claudeAiOauth\":"));
    assert_eq!(
        corrupt.client.fetch_usage().await.unwrap_err(),
        ApiError::CredentialsCorrupted
    );

    mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn connection_refused_is_retried_then_host_unreachable() {
    // Nothing listens on port 1 on loopback.
    let fx = fixture_with("http://127.0.0.1:1", Some(&credentials_doc(FUTURE_MS)));

    let err = fx.client.fetch_usage().await.unwrap_err();

    assert_eq!(err, ApiError::HostUnreachable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn token_refresh_posts_grant() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/oauth/token")
                .json_body(json!({"grant_type": "refresh_token", "refresh_token": "rt-test"}));
            then.status(200).json_body(json!({
                "access_token": "sk-ant-new",
                "refresh_token": "rt-new",
                "expires_in": 28_800
            }));
        })
        .await;
    let fx = fixture(&server);

    let refreshed = fx
        .client
        .refresh_access_token()
        .await
        .expect("refresh should succeed");

    mock.assert_calls_async(1).await;
    assert_eq!(refreshed.access_token, "sk-ant-new");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("rt-new"));
    assert_eq!(refreshed.expires_in, Some(Duration::from_secs(28_800)));
}

#[tokio::test]
async fn token_refresh_rejection_is_reported_with_status() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/oauth/token");
            then.status(400).json_body(json!({"error": "invalid_grant"}));
        })
        .await;
    let fx = fixture(&server);

    let err = fx.client.refresh_access_token().await.unwrap_err();

    assert_eq!(err, ApiError::TokenRefreshFailed(400));
    assert!(err.requires_reauthentication());
    mock.assert_calls_async(1).await;
}
