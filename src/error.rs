//! Error types for the admin HTTP client.
//!
//! The main error type is [`ClientError`]. Every fallible operation in the
//! crate returns [`ClientResult<T>`]. Failures that reached the wire carry
//! both the raw [`TransportFailure`] and the [`ErrorInfo`] the classifier
//! derived from it, so callers can run their own `catch` logic after the
//! global notification pipeline has already surfaced the error.
//!
//! # Error Handling Example
//!
//! ```rust,no_run
//! use evco_http::{ClientError, ErrorType};
//!
//! fn handle(err: ClientError) {
//!     match err.error_type() {
//!         ErrorType::Validation => {
//!             // Show field-level messages from the 422 body
//!         }
//!         _ if err.is_retryable() => println!("Temporary issue: {}", err.user_message()),
//!         _ => println!("{}", err.user_message()),
//!     }
//! }
//! ```

use crate::classifier::TransportFailure;
use crate::core_types::{ErrorInfo, ErrorSeverity, ErrorType};
use crate::logging::{log_error, log_warn};
use thiserror::Error;

/// Convenient result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the admin API.
///
/// | Variant | Error type | Retryable |
/// |---------|------------|-----------|
/// | `ConfigurationError` | Unknown | No |
/// | `Transport` | from status table | Network/Server only |
/// | `AuthExpired` | Authentication | No |
/// | `RefreshFailed` | Authentication | No |
/// | `ResponseParsingError` | Unknown | No |
/// | `StorageError` | Unknown | No |
#[derive(Error, Debug)]
pub enum ClientError {
    /// Client configuration is invalid or incomplete.
    #[error("Client configuration error: {message}")]
    ConfigurationError { message: String },

    /// The request failed on the wire or came back with a non-2xx status.
    ///
    /// `info` is the classified form of `failure`.
    #[error("{} {} failed: {}", .failure.method, .failure.url, .info.message)]
    Transport {
        failure: Box<TransportFailure>,
        info: Box<ErrorInfo>,
    },

    /// The session can no longer be recovered; credentials were cleared and
    /// the navigator was sent to the login route.
    #[error("Session expired: {message}")]
    AuthExpired { message: String },

    /// The refresh-token exchange failed. Every request queued behind the
    /// same refresh receives this error.
    #[error("Token refresh failed: {message}")]
    RefreshFailed { message: String },

    /// A 2xx response body could not be decoded.
    #[error("Response parsing failed: {message}")]
    ResponseParsingError { message: String },

    /// Reading or writing persisted credentials failed.
    #[error("Credential storage error: {message}")]
    StorageError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ClientError {
    /// Classified type of this error, for routing decisions.
    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::Transport { info, .. } => info.error_type,
            Self::AuthExpired { .. } | Self::RefreshFailed { .. } => ErrorType::Authentication,
            Self::ConfigurationError { .. }
            | Self::ResponseParsingError { .. }
            | Self::StorageError { .. } => ErrorType::Unknown,
        }
    }

    /// HTTP status of the failing response, if one arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { failure, .. } => failure.status,
            _ => None,
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { info, .. } => info.retryable,
            _ => false,
        }
    }

    /// Message safe to show to end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { info, .. } => info.message.clone(),
            Self::AuthExpired { .. } | Self::RefreshFailed { .. } => {
                "Your session has expired. Please log in again".to_string()
            }
            Self::ConfigurationError { .. } => {
                "Client configuration issue. Please check your settings".to_string()
            }
            Self::ResponseParsingError { .. } => {
                "Received an invalid response from the server".to_string()
            }
            Self::StorageError { .. } => "Unable to access saved credentials".to_string(),
        }
    }

    /// Classified record for this error, suitable for the dispatcher.
    pub fn error_info(&self) -> ErrorInfo {
        match self {
            Self::Transport { info, .. } => info.as_ref().clone(),
            Self::AuthExpired { .. } | Self::RefreshFailed { .. } => ErrorInfo::new(
                ErrorType::Authentication,
                ErrorSeverity::High,
                self.user_message(),
            ),
            _ => ErrorInfo::new(ErrorType::Unknown, ErrorSeverity::Medium, self.user_message()),
        }
    }

    // =========================================================================
    // Constructor methods with automatic logging
    // =========================================================================

    pub fn configuration_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "configuration_error",
            message = %message,
            "Client configuration validation failed"
        );
        Self::ConfigurationError { message }
    }

    /// Wrap a classified transport failure (logs at WARN for client-side
    /// statuses, ERROR otherwise).
    pub fn transport(failure: TransportFailure, info: ErrorInfo) -> Self {
        if info.severity >= ErrorSeverity::High {
            log_error!(
                error_type = "transport",
                method = %failure.method,
                url = %failure.url,
                status = ?failure.status,
                classified_as = %info.error_type,
                "HTTP request failed"
            );
        } else {
            log_warn!(
                error_type = "transport",
                method = %failure.method,
                url = %failure.url,
                status = ?failure.status,
                classified_as = %info.error_type,
                "HTTP request rejected"
            );
        }
        Self::Transport {
            failure: Box::new(failure),
            info: Box::new(info),
        }
    }

    pub fn auth_expired(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "auth_expired",
            message = %message,
            "Session expired, credentials cleared"
        );
        Self::AuthExpired { message }
    }

    pub fn refresh_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "refresh_failed",
            message = %message,
            "Access token refresh failed"
        );
        Self::RefreshFailed { message }
    }

    pub fn response_parsing_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "response_parsing_error",
            message = %message,
            "API response format invalid"
        );
        Self::ResponseParsingError { message }
    }

    pub fn storage_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let message = message.into();
        log_error!(
            error_type = "storage_error",
            message = %message,
            has_source = source.is_some(),
            "Credential storage operation failed"
        );
        Self::StorageError { message, source }
    }
}
