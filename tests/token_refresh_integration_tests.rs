//! Integration Tests for Transparent Token Refresh
//!
//! UNIT UNDER TEST: AdminHttpClient + TokenRefreshCoordinator + HttpTokenRefresher
//!
//! BUSINESS RESPONSIBILITY:
//!   - Recover from expired access tokens without the caller noticing
//!   - Issue a single refresh for any number of simultaneous 401s
//!   - Send the user to login when the session cannot be recovered
//!
//! TEST COVERAGE:
//!   - Concurrent 401s sharing one refresh and replaying with the new token
//!   - Missing refresh token, then an independent refresh after re-login
//!   - Refresh endpoint rejection failing every queued request
//!   - A replayed request rejected again
//!   - 401 from the login endpoint bypassing refresh

mod common;

use common::harness;
use evco_http::{ClientError, CredentialStore};
use futures_util::future::join_all;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_protected_groups(server: &MockServer, valid_token: &str) {
    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(header("authorization", format!("Bearer {valid_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_401s_trigger_exactly_one_refresh() {
    // Test verifies a burst of expired requests shares one refresh
    // Ensures the refresh endpoint is not hammered and every request succeeds

    let server = MockServer::start().await;
    mount_protected_groups(&server, "fresh-access").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": "refresh-1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "fresh-access", "refreshToken": "refresh-2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some("expired-access"), Some("refresh-1"));

    let results = join_all((0..5).map(|_| h.client.get_json::<Value>("/groups"))).await;

    for result in results {
        let groups = result.expect("Every request should succeed after refresh");
        assert_eq!(groups[0]["id"], 1);
    }
    assert_eq!(h.client.coordinator().refresh_calls(), 1);
    assert_eq!(h.store.access_token().as_deref(), Some("fresh-access"));
    assert_eq!(h.store.refresh_token().as_deref(), Some("refresh-2"));
    assert_eq!(h.sink.toast_count(), 0, "Recovered 401s are never toasted");
    assert_eq!(h.navigator.redirects_to("/login"), 0);
}

#[tokio::test]
async fn test_missing_refresh_token_redirects_then_later_refresh_is_independent() {
    let server = MockServer::start().await;
    mount_protected_groups(&server, "fresh-access").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh-access"})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some("expired-access"), None);

    // No refresh token: session ends without calling the refresh endpoint
    let first = h.client.get_json::<Value>("/groups").await;
    assert!(matches!(first, Err(ClientError::AuthExpired { .. })));
    assert!(h.store.access_token().is_none());
    assert_eq!(h.navigator.redirects_to("/login"), 1);

    // User logs in again; a later 401 runs its own refresh cycle
    h.store
        .store_tokens("expired-again", Some("refresh-after-login"))
        .expect("Memory store never fails");
    let second: Value = h
        .client
        .get_json("/groups")
        .await
        .expect("Fresh cycle should recover");

    assert_eq!(second[0]["id"], 1);
    assert_eq!(h.client.coordinator().refresh_calls(), 1);
}

#[tokio::test]
async fn test_refresh_rejection_fails_all_queued_requests() {
    let server = MockServer::start().await;
    mount_protected_groups(&server, "never-issued").await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": "Refresh token revoked"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some("expired-access"), Some("revoked"));

    let results = join_all((0..3).map(|_| h.client.get_json::<Value>("/groups"))).await;

    let messages: Vec<String> = results
        .into_iter()
        .map(|result| match result {
            Err(ClientError::RefreshFailed { message }) => message,
            other => panic!("Expected RefreshFailed, got {other:?}"),
        })
        .collect();
    assert!(messages.iter().all(|m| m == &messages[0]), "Every waiter sees the same error");
    assert!(h.store.access_token().is_none());
    assert!(h.store.refresh_token().is_none());
    assert_eq!(h.navigator.redirects_to("/login"), 1);
}

#[tokio::test]
async fn test_replayed_request_rejected_again_ends_session() {
    // Test verifies a 401 after a successful refresh is terminal
    // Ensures a token the backend keeps rejecting cannot cause a refresh loop

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/users"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "still-rejected"})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some("expired-access"), Some("refresh-1"));

    let result = h.client.get_json::<Value>("/admin/users").await;

    assert!(matches!(result, Err(ClientError::AuthExpired { .. })));
    assert!(h.store.access_token().is_none());
    assert_eq!(h.navigator.redirects_to("/login"), 1);
}

#[tokio::test]
async fn test_login_401_is_returned_without_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server, None, Some("stale-refresh"));

    let result: Result<Value, _> = h
        .client
        .post_json("/auth/login", &json!({"email": "admin@evco.test", "password": "wrong"}))
        .await;

    let err = result.expect_err("Login should fail");
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.user_message(), "Invalid credentials");
    assert_eq!(h.sink.toast_count(), 0);
    assert_eq!(h.navigator.redirects_to("/login"), 0);
}
