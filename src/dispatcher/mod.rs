//! Error notification dispatch
//!
//! Routes classified errors to one of three channels:
//!
//! ```text
//!  ErrorInfo ──► resolve_channel(severity, intent)
//!                  ├─ PersistentList  ──► ErrorRegistry (modal presentation)
//!                  ├─ Snackbar        ──► SnackbarQueue
//!                  └─ Toast ──► NotificationDeduper ──► NotificationSink
//! ```

pub mod channel;
pub mod registry;
pub mod sink;
pub mod snackbar;

pub use channel::{resolve_channel, CallerIntent, Channel};
pub use registry::ErrorRegistry;
pub use sink::{
    AutoClose, NotificationSink, RecordingSink, Toast, ToastIcon, ToastKind, ToastOptions,
    TracingSink,
};
pub use snackbar::{Snackbar, SnackbarKind, SnackbarQueue};

use crate::classifier::{classify, ErrorInput};
use crate::config::{DedupConfig, NotificationConfig};
use crate::core_types::{ErrorInfo, ErrorOverrides, ErrorSeverity};
use crate::dedup::NotificationDeduper;
use crate::logging::log_debug;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Toast { id: String },
    /// Dropped by the deduper, or rejected by the sink because a toast with
    /// the same id is still on screen.
    Suppressed,
    Snackbar { id: Uuid },
    Persisted { index: usize },
}

/// Routes errors (and success/info/warning messages) to their channel.
#[derive(Debug)]
pub struct ErrorNotificationDispatcher {
    config: NotificationConfig,
    deduper: NotificationDeduper,
    registry: Arc<ErrorRegistry>,
    snackbars: SnackbarQueue,
    sink: Arc<dyn NotificationSink>,
}

impl ErrorNotificationDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_config(
            sink,
            Arc::new(ErrorRegistry::new()),
            NotificationConfig::default(),
            DedupConfig::default(),
        )
    }

    pub fn with_config(
        sink: Arc<dyn NotificationSink>,
        registry: Arc<ErrorRegistry>,
        config: NotificationConfig,
        dedup: DedupConfig,
    ) -> Self {
        Self {
            config,
            deduper: NotificationDeduper::new(dedup),
            registry,
            snackbars: SnackbarQueue::new(),
            sink,
        }
    }

    pub fn registry(&self) -> &Arc<ErrorRegistry> {
        &self.registry
    }

    pub fn snackbars(&self) -> &SnackbarQueue {
        &self.snackbars
    }

    pub fn sink(&self) -> &Arc<dyn NotificationSink> {
        &self.sink
    }

    /// Classify `input` and route it.
    pub fn show_error(&self, input: impl Into<ErrorInput>, intent: CallerIntent) -> Dispatch {
        self.notify(classify(input, ErrorOverrides::none()), intent)
    }

    pub fn notify(&self, info: ErrorInfo, intent: CallerIntent) -> Dispatch {
        let channel = resolve_channel(info.severity, intent);
        log_debug!(
            error_type = %info.error_type,
            severity = %info.severity,
            channel = ?channel,
            "Dispatching error notification"
        );

        match channel {
            Channel::PersistentList => Dispatch::Persisted {
                index: self.registry.push(info),
            },
            Channel::Snackbar => {
                let (kind, duration) = match info.severity {
                    ErrorSeverity::High | ErrorSeverity::Critical => {
                        (SnackbarKind::Error, self.config.snackbar_high_duration)
                    }
                    ErrorSeverity::Medium => {
                        (SnackbarKind::Warning, self.config.snackbar_default_duration)
                    }
                    ErrorSeverity::Low => (SnackbarKind::Info, self.config.snackbar_default_duration),
                };
                let id = self
                    .snackbars
                    .push(info.message, kind, duration, info.action);
                Dispatch::Snackbar { id }
            }
            Channel::Toast => self.toast(&info, ToastOptions::default()),
        }
    }

    /// Toast channel with explicit options, still gated by the deduper.
    ///
    /// Critical toasts stay until dismissed unless `options` says otherwise.
    pub fn toast(&self, info: &ErrorInfo, options: ToastOptions) -> Dispatch {
        if !self.deduper.should_show(info) {
            return Dispatch::Suppressed;
        }

        let id = options.toast_id.unwrap_or_else(|| {
            format!("error-{}-{}", self.deduper.signature(info), Uuid::new_v4())
        });
        let auto_close = options.auto_close.unwrap_or(if info.severity == ErrorSeverity::Critical {
            AutoClose::Never
        } else {
            AutoClose::After(self.config.toast_duration)
        });

        if !self
            .sink
            .show_toast(Toast::from_error(id.clone(), info, auto_close))
        {
            log_debug!(toast_id = %id, "Toast already on screen");
            return Dispatch::Suppressed;
        }
        Dispatch::Toast { id }
    }

    pub fn dismiss_toast(&self, id: &str) {
        self.sink.dismiss_toast(id);
    }

    pub fn success(&self, message: impl Into<String>, title: Option<&str>, use_snackbar: bool) -> Dispatch {
        self.plain(
            message.into(),
            title,
            use_snackbar,
            (ToastKind::Success, ToastIcon::Success, self.config.success_toast_duration),
            (SnackbarKind::Success, self.config.snackbar_default_duration),
        )
    }

    pub fn info(&self, message: impl Into<String>, title: Option<&str>, use_snackbar: bool) -> Dispatch {
        self.plain(
            message.into(),
            title,
            use_snackbar,
            (ToastKind::Info, ToastIcon::Info, self.config.info_toast_duration),
            (SnackbarKind::Info, self.config.snackbar_info_duration),
        )
    }

    pub fn warning(&self, message: impl Into<String>, title: Option<&str>, use_snackbar: bool) -> Dispatch {
        self.plain(
            message.into(),
            title,
            use_snackbar,
            (ToastKind::Warning, ToastIcon::Warning, self.config.warning_toast_duration),
            (SnackbarKind::Warning, self.config.snackbar_warning_duration),
        )
    }

    fn plain(
        &self,
        message: String,
        title: Option<&str>,
        use_snackbar: bool,
        toast: (ToastKind, ToastIcon, Duration),
        snackbar: (SnackbarKind, Duration),
    ) -> Dispatch {
        if use_snackbar {
            let (kind, duration) = snackbar;
            return Dispatch::Snackbar {
                id: self.snackbars.push(message, kind, duration, None),
            };
        }

        let (kind, icon, duration) = toast;
        let id = Uuid::new_v4().to_string();
        let shown = self.sink.show_toast(Toast {
            id: id.clone(),
            kind,
            icon,
            severity: None,
            title: title.map(str::to_string),
            message,
            details: None,
            retry: None,
            auto_close: AutoClose::After(duration),
        });
        if !shown {
            return Dispatch::Suppressed;
        }
        Dispatch::Toast { id }
    }
}
