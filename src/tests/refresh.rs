// Unit Tests for Access-Token Refresh Coordination
//
// UNIT UNDER TEST: TokenRefreshCoordinator
//
// BUSINESS RESPONSIBILITY:
//   - Issues exactly one refresh-token exchange per burst of 401s
//   - Hands every queued request the same outcome, exactly once
//   - Ends the session when the refresh cannot succeed
//   - Treats a 401 after a retry, or from the refresh endpoint, as terminal
//
// TEST COVERAGE:
//   - Successful refresh persisting rotated tokens
//   - Terminal paths (retried request, refresh endpoint, missing token)
//   - Refresh failure and empty access tokens
//   - Concurrent 401s sharing one refresh, success and failure
//   - Cancellation of the leading request releasing waiters

use crate::error::{ClientError, ClientResult};
use crate::refresh::{MockTokenRefresher, RefreshPhase, RefreshResponse, TokenRefreshCoordinator, TokenRefresher};
use crate::session::CredentialStore;
use crate::tests::helpers::{session_fixture, SessionFixture};
use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const GROUPS_URL: &str = "http://localhost:8080/groups";
const REFRESH_URL: &str = "http://localhost:8080/auth/refresh";

fn tokens(access: &str, refresh: Option<&str>) -> RefreshResponse {
    RefreshResponse {
        access_token: Some(access.to_string()),
        refresh_token: refresh.map(str::to_string),
    }
}

fn coordinator(refresher: impl TokenRefresher + 'static, fixture: &SessionFixture) -> TokenRefreshCoordinator {
    TokenRefreshCoordinator::new(Arc::new(refresher), fixture.guard.clone(), "/auth/refresh")
}

/// Refresher that takes a while, so concurrent callers pile up behind it.
#[derive(Debug)]
struct SlowRefresher {
    delay: Duration,
    outcome: Result<RefreshResponse, String>,
    calls: AtomicU32,
}

impl SlowRefresher {
    fn succeeding(access: &str) -> Self {
        Self {
            delay: Duration::from_millis(100),
            outcome: Ok(tokens(access, None)),
            calls: AtomicU32::new(0),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            delay: Duration::from_millis(100),
            outcome: Err(message.to_string()),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TokenRefresher for SlowRefresher {
    async fn refresh(&self, _refresh_token: &str) -> ClientResult<RefreshResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.outcome
            .clone()
            .map_err(|message| ClientError::RefreshFailed { message })
    }
}

#[cfg(test)]
mod single_request_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_refresh_returns_and_persists_new_tokens() {
        // Arrange
        let fixture = session_fixture(Some("expired"), Some("refresh-1"), "/groups");
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh()
            .withf(|token| token == "refresh-1")
            .times(1)
            .returning(|_| Ok(tokens("access-2", Some("refresh-2"))));
        let coordinator = coordinator(refresher, &fixture);

        // Act
        let result = coordinator.on_unauthorized(GROUPS_URL, false).await;

        // Assert
        assert_eq!(result.ok().as_deref(), Some("access-2"));
        assert_eq!(fixture.store.access_token().as_deref(), Some("access-2"));
        assert_eq!(fixture.store.refresh_token().as_deref(), Some("refresh-2"));
        assert_eq!(coordinator.phase(), RefreshPhase::Idle);
        assert_eq!(coordinator.refresh_calls(), 1);
        assert!(fixture.navigator.events().is_empty(), "No redirect on success");
    }

    #[tokio::test]
    async fn test_refresh_without_rotation_keeps_refresh_token() {
        // Arrange
        let fixture = session_fixture(Some("expired"), Some("refresh-1"), "/groups");
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh()
            .returning(|_| Ok(tokens("access-2", None)));
        let coordinator = coordinator(refresher, &fixture);

        // Act
        coordinator
            .on_unauthorized(GROUPS_URL, false)
            .await
            .expect("Refresh should succeed");

        // Assert
        assert_eq!(fixture.store.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_already_retried_request_is_terminal() {
        // Arrange
        let fixture = session_fixture(Some("access"), Some("refresh"), "/groups");
        let mut refresher = MockTokenRefresher::new();
        refresher.expect_refresh().times(0);
        let coordinator = coordinator(refresher, &fixture);

        // Act
        let result = coordinator.on_unauthorized(GROUPS_URL, true).await;

        // Assert
        assert!(matches!(result, Err(ClientError::AuthExpired { .. })));
        assert!(fixture.store.access_token().is_none());
        assert_eq!(fixture.navigator.redirects_to("/login"), 1);
    }

    #[tokio::test]
    async fn test_401_from_refresh_endpoint_is_terminal() {
        // Arrange
        let fixture = session_fixture(Some("access"), Some("refresh"), "/groups");
        let mut refresher = MockTokenRefresher::new();
        refresher.expect_refresh().times(0);
        let coordinator = coordinator(refresher, &fixture);

        // Act
        let result = coordinator.on_unauthorized(REFRESH_URL, false).await;

        // Assert
        assert!(matches!(result, Err(ClientError::AuthExpired { .. })));
        assert_eq!(fixture.store.snapshot(), Default::default());
        assert_eq!(coordinator.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_ends_session_without_calling_refresher() {
        // Arrange
        let fixture = session_fixture(Some("expired"), None, "/groups");
        let mut refresher = MockTokenRefresher::new();
        refresher.expect_refresh().times(0);
        let coordinator = coordinator(refresher, &fixture);

        // Act
        let result = coordinator.on_unauthorized(GROUPS_URL, false).await;

        // Assert
        assert!(matches!(result, Err(ClientError::AuthExpired { .. })));
        assert!(fixture.store.access_token().is_none());
        assert_eq!(fixture.navigator.redirects_to("/login"), 1);
        assert_eq!(coordinator.phase(), RefreshPhase::Idle);
    }

    #[tokio::test]
    async fn test_missing_token_cycle_does_not_block_next_refresh() {
        // Test verifies a fresh 401 after a failed cycle starts a new refresh

        // Arrange
        let fixture = session_fixture(Some("expired"), None, "/groups");
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh()
            .times(1)
            .returning(|_| Ok(tokens("access-3", None)));
        let coordinator = coordinator(refresher, &fixture);
        let _ = coordinator.on_unauthorized(GROUPS_URL, false).await;

        // Act
        fixture
            .store
            .store_tokens("expired", Some("refresh-after-login"))
            .expect("Memory store never fails");
        let result = coordinator.on_unauthorized(GROUPS_URL, false).await;

        // Assert
        assert_eq!(result.ok().as_deref(), Some("access-3"));
        assert_eq!(coordinator.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_ends_session() {
        // Arrange
        let fixture = session_fixture(Some("expired"), Some("revoked"), "/groups");
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh()
            .times(1)
            .returning(|_| Err(ClientError::refresh_failed("Refresh endpoint returned 401 Unauthorized")));
        let coordinator = coordinator(refresher, &fixture);

        // Act
        let result = coordinator.on_unauthorized(GROUPS_URL, false).await;

        // Assert
        match result {
            Err(ClientError::RefreshFailed { message }) => {
                assert_eq!(message, "Refresh endpoint returned 401 Unauthorized");
            }
            other => panic!("Expected RefreshFailed, got {other:?}"),
        }
        assert!(fixture.store.refresh_token().is_none());
        assert_eq!(fixture.navigator.redirects_to("/login"), 1);
    }

    #[tokio::test]
    async fn test_empty_access_token_counts_as_failure() {
        // Arrange
        let fixture = session_fixture(Some("expired"), Some("refresh"), "/groups");
        let mut refresher = MockTokenRefresher::new();
        refresher
            .expect_refresh()
            .returning(|_| Ok(tokens("", None)));
        let coordinator = coordinator(refresher, &fixture);

        // Act
        let result = coordinator.on_unauthorized(GROUPS_URL, false).await;

        // Assert
        assert!(matches!(result, Err(ClientError::RefreshFailed { .. })));
        assert!(fixture.store.access_token().is_none());
    }

    #[tokio::test]
    async fn test_no_redirect_when_already_on_login() {
        // Arrange
        let fixture = session_fixture(Some("expired"), None, "/login");
        let coordinator = coordinator(MockTokenRefresher::new(), &fixture);

        // Act
        let _ = coordinator.on_unauthorized(GROUPS_URL, false).await;

        // Assert
        assert!(fixture.navigator.events().is_empty());
        assert!(fixture.store.access_token().is_none(), "Credentials cleared regardless");
    }
}

#[cfg(test)]
mod concurrent_request_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_401s_share_one_refresh() {
        // Test verifies five simultaneous 401s cause a single exchange
        // Ensures every caller retries with the same new token

        // Arrange
        let fixture = session_fixture(Some("expired"), Some("refresh"), "/groups");
        let refresher = Arc::new(SlowRefresher::succeeding("shared-token"));
        let coordinator = TokenRefreshCoordinator::new(refresher.clone(), fixture.guard.clone(), "/auth/refresh");

        // Act
        let results = join_all((0..5).map(|_| coordinator.on_unauthorized(GROUPS_URL, false))).await;

        // Assert
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.refresh_calls(), 1);
        for result in results {
            assert_eq!(result.ok().as_deref(), Some("shared-token"));
        }
        assert_eq!(coordinator.phase(), RefreshPhase::Idle);
        assert_eq!(coordinator.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_rejects_every_waiter_with_same_error() {
        // Arrange
        let fixture = session_fixture(Some("expired"), Some("refresh"), "/groups");
        let refresher = Arc::new(SlowRefresher::failing("refresh token revoked"));
        let coordinator = TokenRefreshCoordinator::new(refresher.clone(), fixture.guard.clone(), "/auth/refresh");

        // Act
        let results = join_all((0..4).map(|_| coordinator.on_unauthorized(GROUPS_URL, false))).await;

        // Assert
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        for result in results {
            match result {
                Err(ClientError::RefreshFailed { message }) => assert_eq!(message, "refresh token revoked"),
                other => panic!("Expected RefreshFailed, got {other:?}"),
            }
        }
        assert_eq!(fixture.navigator.redirects_to("/login"), 1, "Only the leader redirects");
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_cycle_after_settlement_refreshes_again() {
        // Arrange
        let fixture = session_fixture(Some("expired"), Some("refresh"), "/groups");
        let refresher = Arc::new(SlowRefresher::succeeding("token"));
        let coordinator = TokenRefreshCoordinator::new(refresher.clone(), fixture.guard.clone(), "/auth/refresh");

        // Act
        coordinator.on_unauthorized(GROUPS_URL, false).await.expect("first cycle");
        coordinator.on_unauthorized(GROUPS_URL, false).await.expect("second cycle");

        // Assert
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_leader_releases_waiters() {
        // Test verifies dropping the leading request mid-refresh settles the queue
        // Ensures no request waits forever on an abandoned refresh

        // Arrange
        let fixture = session_fixture(Some("expired"), Some("refresh"), "/groups");
        let refresher = Arc::new(SlowRefresher::succeeding("never-delivered"));
        let coordinator = TokenRefreshCoordinator::new(refresher, fixture.guard.clone(), "/auth/refresh");

        // Act
        let leader = tokio::time::timeout(
            Duration::from_millis(50),
            coordinator.on_unauthorized(GROUPS_URL, false),
        );
        let waiter = coordinator.on_unauthorized(GROUPS_URL, false);
        let (leader_result, waiter_result) = tokio::join!(leader, waiter);

        // Assert
        assert!(leader_result.is_err(), "Leader timed out");
        match waiter_result {
            Err(ClientError::RefreshFailed { message }) => {
                assert_eq!(message, "Token refresh was cancelled");
            }
            other => panic!("Expected RefreshFailed, got {other:?}"),
        }
        assert_eq!(coordinator.phase(), RefreshPhase::Idle);
    }
}
