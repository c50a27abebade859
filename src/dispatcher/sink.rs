//! Rendering seam for toasts and the backend-down warning

use crate::core_types::{ErrorAction, ErrorInfo, ErrorSeverity, ErrorType};
use crate::health::HealthWarning;
use crate::logging::{log_error, log_info, log_warn};
use parking_lot::Mutex;
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Error,
    Success,
    Info,
    Warning,
}

/// Icon shown next to an error toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastIcon {
    Warning,
    Error,
    Exclamation,
    Info,
    Success,
}

impl ToastIcon {
    pub fn for_error_type(error_type: ErrorType) -> Self {
        match error_type {
            ErrorType::Network => Self::Warning,
            ErrorType::Authentication | ErrorType::Authorization | ErrorType::Server => Self::Error,
            ErrorType::Validation => Self::Exclamation,
            _ => Self::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoClose {
    After(Duration),
    Never,
}

impl AutoClose {
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::After(duration) => Some(*duration),
            Self::Never => None,
        }
    }
}

/// Per-call toast options.
#[derive(Debug, Clone, Default)]
pub struct ToastOptions {
    /// Toasts sharing an id are not shown twice while one is on screen.
    pub toast_id: Option<String>,
    pub auto_close: Option<AutoClose>,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: String,
    pub kind: ToastKind,
    pub icon: ToastIcon,
    pub severity: Option<ErrorSeverity>,
    pub title: Option<String>,
    pub message: String,
    pub details: Option<String>,
    /// Present only for retryable errors that carry an action.
    pub retry: Option<ErrorAction>,
    pub auto_close: AutoClose,
}

impl Toast {
    /// Error toast for a classified record.
    pub fn from_error(id: String, info: &ErrorInfo, auto_close: AutoClose) -> Self {
        let retry = if info.retryable { info.action.clone() } else { None };
        Self {
            id,
            kind: ToastKind::Error,
            icon: ToastIcon::for_error_type(info.error_type),
            severity: Some(info.severity),
            title: info.title.clone(),
            message: info.message.clone(),
            details: info.details.clone(),
            retry,
            auto_close,
        }
    }
}

/// Whatever actually draws notifications.
pub trait NotificationSink: Send + Sync + Debug {
    /// Returns `false` when the toast was not displayed, e.g. because a
    /// toast with the same id is still on screen.
    fn show_toast(&self, toast: Toast) -> bool;

    fn dismiss_toast(&self, id: &str);

    /// Blocking warning distinct from ordinary toasts.
    fn show_health_warning(&self, warning: &HealthWarning);

    fn hide_health_warning(&self);
}

/// Sink that writes every notification to the log.
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn show_toast(&self, toast: Toast) -> bool {
        match toast.kind {
            ToastKind::Error => log_error!(
                toast_id = %toast.id,
                title = ?toast.title,
                message = %toast.message,
                "Error toast"
            ),
            ToastKind::Warning => log_warn!(toast_id = %toast.id, message = %toast.message, "Warning toast"),
            _ => log_info!(toast_id = %toast.id, message = %toast.message, "Toast"),
        }
        true
    }

    fn dismiss_toast(&self, id: &str) {
        log_info!(toast_id = id, "Toast dismissed");
    }

    fn show_health_warning(&self, warning: &HealthWarning) {
        log_error!(
            consecutive_errors = warning.consecutive_errors,
            message = %warning.error.message,
            "Backend appears to be down"
        );
    }

    fn hide_health_warning(&self) {
        log_info!("Backend health warning cleared");
    }
}

#[derive(Debug, Clone)]
struct ShownToast {
    toast: Toast,
    shown_at: Instant,
    dismissed: bool,
}

impl ShownToast {
    fn active_at(&self, now: Instant) -> bool {
        !self.dismissed
            && match self.toast.auto_close {
                AutoClose::Never => true,
                AutoClose::After(duration) => now < self.shown_at + duration,
            }
    }
}

/// In-memory sink for headless use and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    toasts: Mutex<Vec<ShownToast>>,
    health_warning: Mutex<Option<HealthWarning>>,
    health_warnings_shown: Mutex<u32>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every toast ever displayed, in order.
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().iter().map(|s| s.toast.clone()).collect()
    }

    pub fn toast_count(&self) -> usize {
        self.toasts.lock().len()
    }

    /// Toasts still on screen.
    pub fn active_toasts(&self) -> Vec<Toast> {
        let now = Instant::now();
        self.toasts
            .lock()
            .iter()
            .filter(|s| s.active_at(now))
            .map(|s| s.toast.clone())
            .collect()
    }

    pub fn health_warning(&self) -> Option<HealthWarning> {
        self.health_warning.lock().clone()
    }

    pub fn health_warnings_shown(&self) -> u32 {
        *self.health_warnings_shown.lock()
    }
}

impl NotificationSink for RecordingSink {
    fn show_toast(&self, toast: Toast) -> bool {
        let now = Instant::now();
        let mut toasts = self.toasts.lock();
        if toasts
            .iter()
            .any(|s| s.toast.id == toast.id && s.active_at(now))
        {
            return false;
        }
        toasts.push(ShownToast {
            toast,
            shown_at: now,
            dismissed: false,
        });
        true
    }

    fn dismiss_toast(&self, id: &str) {
        for shown in self.toasts.lock().iter_mut().filter(|s| s.toast.id == id) {
            shown.dismissed = true;
        }
    }

    fn show_health_warning(&self, warning: &HealthWarning) {
        *self.health_warning.lock() = Some(warning.clone());
        *self.health_warnings_shown.lock() += 1;
    }

    fn hide_health_warning(&self) {
        *self.health_warning.lock() = None;
    }
}
