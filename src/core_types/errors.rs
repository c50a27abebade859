//! Classified error records shared by every notification channel.
//!
//! [`ErrorInfo`] is what the classifier produces and what the dispatcher,
//! deduper and health monitor consume. It is transient: created when a
//! failure is observed, held by a channel until dismissed, never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Broad class of a failure, decided from the HTTP status or transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// No response reached us (connection refused, timeout, DNS).
    Network,
    /// 422 responses; handled by forms, never toasted globally.
    Validation,
    /// 401 responses that survived the refresh flow.
    Authentication,
    /// 403 responses.
    Authorization,
    /// 404 responses.
    NotFound,
    /// 500 and 503 responses.
    Server,
    /// 400 responses.
    Client,
    /// Anything the status table does not cover.
    Unknown,
}

impl ErrorType {
    /// Upper-case wire name, also used in dedup signatures.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "NETWORK",
            Self::Validation => "VALIDATION",
            Self::Authentication => "AUTHENTICATION",
            Self::Authorization => "AUTHORIZATION",
            Self::NotFound => "NOT_FOUND",
            Self::Server => "SERVER",
            Self::Client => "CLIENT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Only network and server failures are worth retrying by default.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of a failure. Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable code attached to an error: the HTTP status when the
/// error came from a response, or a backend-provided string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Status(u16),
    Named(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "{status}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Retry or navigation affordance rendered next to an error.
#[derive(Clone)]
pub struct ErrorAction {
    pub label: String,
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl ErrorAction {
    pub fn new(label: impl Into<String>, callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }

    /// Run the action's callback.
    pub fn invoke(&self) {
        (self.callback)()
    }
}

impl fmt::Debug for ErrorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A classified failure ready for presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub severity: ErrorSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub retryable: bool,
    #[serde(skip)]
    pub action: Option<ErrorAction>,
}

impl ErrorInfo {
    /// Build a record stamped with the current time and no metadata.
    ///
    /// `retryable` follows [`ErrorType::is_retryable`].
    pub fn new(error_type: ErrorType, severity: ErrorSeverity, message: impl Into<String>) -> Self {
        Self {
            error_type,
            severity,
            message: message.into(),
            title: None,
            code: None,
            details: None,
            timestamp: Utc::now(),
            retryable: error_type.is_retryable(),
            action: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_action(mut self, action: ErrorAction) -> Self {
        self.action = Some(action);
        self
    }

    /// HTTP status carried in `code`, if any.
    pub fn status(&self) -> Option<u16> {
        match self.code {
            Some(ErrorCode::Status(status)) => Some(status),
            _ => None,
        }
    }
}

/// Caller-supplied fields that replace derived ones after classification.
///
/// Every `Some` field wins over whatever the classifier computed.
#[derive(Debug, Clone, Default)]
pub struct ErrorOverrides {
    pub error_type: Option<ErrorType>,
    pub severity: Option<ErrorSeverity>,
    pub message: Option<String>,
    pub title: Option<String>,
    pub code: Option<ErrorCode>,
    pub details: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub retryable: Option<bool>,
    pub action: Option<ErrorAction>,
}

impl ErrorOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn action(mut self, action: ErrorAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Merge onto `info`; override fields take precedence.
    pub fn apply(self, mut info: ErrorInfo) -> ErrorInfo {
        if let Some(error_type) = self.error_type {
            info.error_type = error_type;
        }
        if let Some(severity) = self.severity {
            info.severity = severity;
        }
        if let Some(message) = self.message {
            info.message = message;
        }
        if let Some(title) = self.title {
            info.title = Some(title);
        }
        if let Some(code) = self.code {
            info.code = Some(code);
        }
        if let Some(details) = self.details {
            info.details = Some(details);
        }
        if let Some(timestamp) = self.timestamp {
            info.timestamp = timestamp;
        }
        if let Some(retryable) = self.retryable {
            info.retryable = retryable;
        }
        if let Some(action) = self.action {
            info.action = Some(action);
        }
        info
    }
}
