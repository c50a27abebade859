//! Backend availability tracking
//!
//! Aggregates failures reported by callers into a rolling "backend down"
//! judgment. The monitor never retries anything itself; it exposes a boolean
//! and, once the threshold is reached, a blocking warning with retry and
//! logout remedies.

use crate::classifier::{TransportErrorCode, TransportFailure};
use crate::config::HealthConfig;
use crate::core_types::{ErrorInfo, ErrorSeverity, ErrorType};
use crate::dispatcher::NotificationSink;
use crate::logging::{log_debug, log_info, log_warn};
use crate::session::SessionGuard;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Instant;

/// Counts failures that arrive within `window` of each other.
///
/// A failure arriving after the window has elapsed restarts the count at 1.
#[derive(Debug, Clone)]
pub struct ConsecutiveFailureCounter {
    window: std::time::Duration,
    count: u32,
    last_failure: Option<Instant>,
}

impl ConsecutiveFailureCounter {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window,
            count: 0,
            last_failure: None,
        }
    }

    /// Record a failure at `now` and return the updated count.
    pub fn record(&mut self, now: Instant) -> u32 {
        match self.last_failure {
            Some(last) if now.saturating_duration_since(last) > self.window => self.count = 1,
            _ => self.count += 1,
        }
        self.last_failure = Some(now);
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.last_failure = None;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last_failure(&self) -> Option<Instant> {
        self.last_failure
    }
}

/// Snapshot of the monitor's judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthState {
    pub is_down: bool,
    pub consecutive_errors: u32,
    pub last_error_time: Option<Instant>,
}

/// Remedies offered by the backend-down warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthAction {
    /// Reset and reload the page.
    Retry,
    /// Clear credentials and go to login.
    Logout,
}

/// Blocking warning surfaced when the threshold is first reached.
#[derive(Debug, Clone)]
pub struct HealthWarning {
    pub error: ErrorInfo,
    pub consecutive_errors: u32,
    pub actions: Vec<HealthAction>,
}

impl HealthWarning {
    fn new(consecutive_errors: u32) -> Self {
        let error = ErrorInfo::new(
            ErrorType::Network,
            ErrorSeverity::Critical,
            "Cannot connect to server. The backend service may be down or your connection is \
             unstable. You can still navigate to other pages, but data may not load.",
        )
        .with_title("Backend Connection Lost")
        .with_retryable(true);

        Self {
            error,
            consecutive_errors,
            actions: vec![HealthAction::Retry, HealthAction::Logout],
        }
    }
}

/// Whether a failure says anything about backend availability: no response,
/// a timeout or aborted connection, or a 5xx status.
pub fn counts_against_health(failure: &TransportFailure) -> bool {
    let network = !failure.has_response()
        || failure.code == Some(TransportErrorCode::ConnectionAborted)
        || failure.code == Some(TransportErrorCode::Timeout)
        || failure.message.contains("Network");
    let server = failure.status.is_some_and(|s| s >= 500);
    network || server
}

#[derive(Debug)]
struct MonitorInner {
    counter: ConsecutiveFailureCounter,
    is_down: bool,
    warning_visible: bool,
}

/// Consecutive-failure backend health monitor.
#[derive(Debug)]
pub struct BackendHealthMonitor {
    config: HealthConfig,
    inner: Mutex<MonitorInner>,
    sink: Arc<dyn NotificationSink>,
    session: Option<SessionGuard>,
}

impl BackendHealthMonitor {
    pub fn new(config: HealthConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            inner: Mutex::new(MonitorInner {
                counter: ConsecutiveFailureCounter::new(config.error_window),
                is_down: false,
                warning_visible: false,
            }),
            config,
            sink,
            session: None,
        }
    }

    /// Attach the session used by the retry and logout remedies.
    pub fn with_session(mut self, session: SessionGuard) -> Self {
        self.session = Some(session);
        self
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    pub fn state(&self) -> HealthState {
        let inner = self.inner.lock();
        HealthState {
            is_down: inner.is_down,
            consecutive_errors: inner.counter.count(),
            last_error_time: inner.counter.last_failure(),
        }
    }

    pub fn is_backend_down(&self) -> bool {
        self.inner.lock().is_down
    }

    pub fn is_warning_visible(&self) -> bool {
        self.inner.lock().warning_visible
    }

    /// Any success clears the judgment and hides the warning.
    pub fn record_success(&self) {
        let was_visible = {
            let mut inner = self.inner.lock();
            let was_down = inner.is_down;
            inner.counter.reset();
            inner.is_down = false;
            if was_down {
                log_info!("Backend reachable again");
            }
            std::mem::replace(&mut inner.warning_visible, false)
        };
        if was_visible {
            self.sink.hide_health_warning();
        }
    }

    pub fn record_error(&self, failure: &TransportFailure) -> bool {
        self.record_error_at(failure, Instant::now())
    }

    /// Record `failure` at `now`. Returns whether it counted; failures that
    /// say nothing about availability leave the state untouched.
    pub fn record_error_at(&self, failure: &TransportFailure, now: Instant) -> bool {
        if !counts_against_health(failure) {
            return false;
        }

        let warning = {
            let mut inner = self.inner.lock();
            let count = inner.counter.record(now);
            let was_down = inner.is_down;
            inner.is_down = count >= self.config.error_threshold;

            log_debug!(
                consecutive_errors = count,
                error_threshold = self.config.error_threshold,
                status = ?failure.status,
                "Backend failure recorded"
            );

            // Only the transition into the down state warns, and never while a
            // warning is already on screen. A dismissed warning stays hidden
            // for the rest of the outage.
            if inner.is_down && !was_down && !inner.warning_visible {
                inner.warning_visible = true;
                log_warn!(
                    consecutive_errors = count,
                    error_window_ms = self.config.error_window.as_millis() as u64,
                    "Backend appears to be down"
                );
                Some(HealthWarning::new(count))
            } else {
                None
            }
        };

        if let Some(warning) = warning {
            self.sink.show_health_warning(&warning);
        }
        true
    }

    /// Close the warning without changing the counters.
    pub fn dismiss_warning(&self) {
        if std::mem::replace(&mut self.inner.lock().warning_visible, false) {
            self.sink.hide_health_warning();
        }
    }

    /// Reset and reload so every query runs again.
    pub fn retry(&self) {
        self.record_success();
        if let Some(session) = &self.session {
            session.reload();
        }
    }

    pub fn logout(&self) {
        if let Some(session) = &self.session {
            session.end_session("logout from backend-down warning");
        }
        self.dismiss_warning();
    }

    pub fn perform(&self, action: HealthAction) {
        match action {
            HealthAction::Retry => self.retry(),
            HealthAction::Logout => self.logout(),
        }
    }
}
