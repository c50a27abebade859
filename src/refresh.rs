//! Access-token refresh coordination
//!
//! Any number of requests may come back 401 at once. The first one to arrive
//! while the coordinator is idle leads a single refresh-token exchange; the
//! rest park on a oneshot until that exchange settles, and all of them see
//! the same outcome.
//!
//! ```text
//!        401 (idle)                 refresh ok / failed
//!  Idle ─────────────► Refreshing ─────────────────────► Idle
//!                        ▲    │ 401 (refreshing): enqueue waiter
//!                        └────┘
//! ```

use crate::error::{ClientError, ClientResult};
use crate::logging::{log_debug, log_info, log_warn};
use crate::session::SessionGuard;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Body returned by the refresh endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    /// Present when the backend rotates refresh tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Performs the refresh-token exchange itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync + Debug {
    async fn refresh(&self, refresh_token: &str) -> ClientResult<RefreshResponse>;
}

/// Refresher that POSTs `{ "refreshToken": .. }` to the refresh endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> ClientResult<RefreshResponse> {
        let response = self
            .client
            .post(&self.url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| ClientError::refresh_failed(format!("Refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::refresh_failed(format!(
                "Refresh endpoint returned {status}"
            )));
        }

        response.json::<RefreshResponse>().await.map_err(|e| {
            ClientError::response_parsing_error(format!("Invalid refresh response: {e}"))
        })
    }
}

type Waiter = oneshot::Sender<Result<String, String>>;

#[derive(Debug)]
enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<Waiter> },
}

/// Observable phase of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

/// Serializes concurrent 401s into one refresh per cycle.
#[derive(Debug)]
pub struct TokenRefreshCoordinator {
    state: Mutex<RefreshState>,
    refresher: Arc<dyn TokenRefresher>,
    session: SessionGuard,
    refresh_path: String,
    refresh_calls: AtomicU64,
}

impl TokenRefreshCoordinator {
    pub fn new(
        refresher: Arc<dyn TokenRefresher>,
        session: SessionGuard,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
            refresher,
            session,
            refresh_path: refresh_path.into(),
            refresh_calls: AtomicU64::new(0),
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        match *self.state.lock() {
            RefreshState::Idle => RefreshPhase::Idle,
            RefreshState::Refreshing { .. } => RefreshPhase::Refreshing,
        }
    }

    /// Requests parked behind the in-flight refresh.
    pub fn queued(&self) -> usize {
        match &*self.state.lock() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Refresh exchanges issued so far.
    pub fn refresh_calls(&self) -> u64 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    /// Handle a 401 for the request to `url`.
    ///
    /// Returns the access token to retry with. A 401 from the refresh
    /// endpoint itself, or from a request that was already retried, ends the
    /// session immediately whatever the current phase.
    pub async fn on_unauthorized(&self, url: &str, already_retried: bool) -> ClientResult<String> {
        if url.contains(&self.refresh_path) || already_retried {
            self.session.end_session("unauthorized after token refresh");
            return Err(ClientError::auth_expired(
                "Request was rejected again after token refresh",
            ));
        }

        let waiter = {
            let mut state = self.state.lock();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    log_debug!(url = %url, queued = waiters.len(), "Queued request behind token refresh");
                    Some(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                    };
                    None
                }
            }
        };

        match waiter {
            Some(rx) => match rx.await {
                Ok(Ok(token)) => Ok(token),
                Ok(Err(message)) => Err(ClientError::RefreshFailed { message }),
                Err(_) => Err(ClientError::refresh_failed(
                    "Token refresh ended without a result",
                )),
            },
            None => self.lead_refresh(url).await,
        }
    }

    async fn lead_refresh(&self, url: &str) -> ClientResult<String> {
        let mut cycle = RefreshCycle::new(self);

        let Some(refresh_token) = self.session.store().refresh_token() else {
            cycle.settle(Err("No refresh token available".to_string()));
            self.session.end_session("no refresh token");
            return Err(ClientError::auth_expired("No refresh token available"));
        };

        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        log_info!(url = %url, "Refreshing access token");

        let outcome = match self.refresher.refresh(&refresh_token).await {
            Ok(response) => match response.access_token.filter(|t| !t.is_empty()) {
                Some(access_token) => self
                    .session
                    .store()
                    .store_tokens(&access_token, response.refresh_token.as_deref())
                    .map(|()| access_token),
                None => Err(ClientError::refresh_failed(
                    "No access token in refresh response",
                )),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(access_token) => {
                cycle.settle(Ok(access_token.clone()));
                Ok(access_token)
            }
            Err(e) => {
                let message = match e {
                    ClientError::RefreshFailed { message } => message,
                    other => other.to_string(),
                };
                cycle.settle(Err(message.clone()));
                self.session.end_session("token refresh failed");
                Err(ClientError::RefreshFailed { message })
            }
        }
    }

    /// Return to idle and hand `outcome` to every parked request, all under
    /// one lock acquisition.
    fn settle(&self, outcome: Result<String, String>) {
        let mut state = self.state.lock();
        let waiters = match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        };

        match &outcome {
            Ok(_) => log_debug!(waiters = waiters.len(), "Releasing requests with new token"),
            Err(message) => log_warn!(
                waiters = waiters.len(),
                message = %message,
                "Rejecting requests queued behind failed refresh"
            ),
        }

        for waiter in waiters {
            // A dropped receiver means the caller gave up; nothing to deliver.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Settles the cycle exactly once, even if the leading future is dropped
/// mid-refresh.
struct RefreshCycle<'a> {
    coordinator: &'a TokenRefreshCoordinator,
    settled: bool,
}

impl<'a> RefreshCycle<'a> {
    fn new(coordinator: &'a TokenRefreshCoordinator) -> Self {
        Self {
            coordinator,
            settled: false,
        }
    }

    fn settle(&mut self, outcome: Result<String, String>) {
        if !self.settled {
            self.settled = true;
            self.coordinator.settle(outcome);
        }
    }
}

impl Drop for RefreshCycle<'_> {
    fn drop(&mut self) {
        self.settle(Err("Token refresh was cancelled".to_string()));
    }
}
