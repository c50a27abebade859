//! Failure classification
//!
//! Turns whatever the caller observed (a message, an already-classified
//! record, a transport failure, or an arbitrary error) into an [`ErrorInfo`].
//! The input shape is decided at the call boundary through [`ErrorInput`], so
//! [`classify`] matches exhaustively instead of sniffing fields.

use crate::core_types::{ErrorCode, ErrorInfo, ErrorOverrides, ErrorSeverity, ErrorType};
use crate::error::ClientError;
use crate::logging::{log_debug, log_error};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FALLBACK_MESSAGE: &str = "An error occurred";
const GENERIC_FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// Low-level reason a request produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorCode {
    Timeout,
    ConnectionAborted,
    Network,
    Other,
}

/// Raw failure as seen by the HTTP client.
///
/// `status` is `None` when no response arrived at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportFailure {
    pub method: String,
    pub url: String,
    pub status: Option<u16>,
    pub body: Option<Value>,
    pub message: String,
    pub code: Option<TransportErrorCode>,
}

impl TransportFailure {
    /// A failure where no response was received.
    pub fn network(
        method: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
        code: TransportErrorCode,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            status: None,
            body: None,
            message: message.into(),
            code: Some(code),
        }
    }

    /// A non-2xx response. `body` is decoded as JSON when possible and kept
    /// as a plain string otherwise.
    pub fn from_response(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        body: &str,
    ) -> Self {
        let body = if body.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
        };

        Self {
            method: method.into(),
            url: url.into(),
            status: Some(status),
            body,
            message: format!("Request failed with status code {status}"),
            code: None,
        }
    }

    /// A failure raised by reqwest before any response was read.
    pub fn from_reqwest(err: &reqwest::Error, method: impl Into<String>, url: impl Into<String>) -> Self {
        let code = if err.is_timeout() {
            TransportErrorCode::Timeout
        } else if err.is_connect() {
            TransportErrorCode::Network
        } else if err.is_request() || err.is_body() {
            TransportErrorCode::ConnectionAborted
        } else {
            TransportErrorCode::Other
        };

        let message = match code {
            TransportErrorCode::Timeout => format!("timeout exceeded: {err}"),
            TransportErrorCode::Network => format!("Network Error: {err}"),
            _ => err.to_string(),
        };

        let mut failure = Self::network(method, url, message, code);
        failure.status = err.status().map(|s| s.as_u16());
        failure
    }

    pub fn has_response(&self) -> bool {
        self.status.is_some()
    }

    /// No response and the transport reported a connectivity problem.
    pub fn is_connectivity_failure(&self) -> bool {
        !self.has_response()
            && (matches!(
                self.code,
                Some(
                    TransportErrorCode::Timeout
                        | TransportErrorCode::ConnectionAborted
                        | TransportErrorCode::Network
                )
            ) || self.message.contains("Network Error")
                || self.message.contains("timeout"))
    }

    fn body_message(&self) -> Option<String> {
        let body = self.body.as_ref()?;

        match body.get("message") {
            Some(Value::String(message)) if !message.is_empty() => return Some(message.clone()),
            Some(Value::Array(items)) => match items.first() {
                Some(Value::String(first)) => return Some(first.clone()),
                Some(other) => return Some(other.to_string()),
                None => {}
            },
            _ => {}
        }

        match body.get("error") {
            Some(Value::String(error)) if !error.is_empty() => Some(error.clone()),
            _ => None,
        }
    }
}

/// Everything [`classify`] accepts.
#[derive(Debug)]
pub enum ErrorInput {
    Message(String),
    Classified(ErrorInfo),
    Transport(TransportFailure),
    Generic(anyhow::Error),
}

impl From<&str> for ErrorInput {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<String> for ErrorInput {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<ErrorInfo> for ErrorInput {
    fn from(info: ErrorInfo) -> Self {
        Self::Classified(info)
    }
}

impl From<TransportFailure> for ErrorInput {
    fn from(failure: TransportFailure) -> Self {
        Self::Transport(failure)
    }
}

impl From<anyhow::Error> for ErrorInput {
    fn from(err: anyhow::Error) -> Self {
        Self::Generic(err)
    }
}

impl From<ClientError> for ErrorInput {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Transport { failure, .. } => Self::Transport(*failure),
            other => Self::Classified(other.error_info()),
        }
    }
}

/// Type and severity for an HTTP status. `None` means no response.
pub fn status_classification(status: Option<u16>) -> (ErrorType, ErrorSeverity) {
    match status {
        None => (ErrorType::Network, ErrorSeverity::High),
        Some(400) => (ErrorType::Client, ErrorSeverity::Low),
        Some(401) => (ErrorType::Authentication, ErrorSeverity::High),
        Some(403) => (ErrorType::Authorization, ErrorSeverity::Medium),
        Some(404) => (ErrorType::NotFound, ErrorSeverity::Low),
        Some(422) => (ErrorType::Validation, ErrorSeverity::Low),
        Some(500) | Some(503) => (ErrorType::Server, ErrorSeverity::High),
        Some(_) => (ErrorType::Unknown, ErrorSeverity::Medium),
    }
}

/// Classify `input`, then apply `overrides` on top.
pub fn classify(input: impl Into<ErrorInput>, overrides: ErrorOverrides) -> ErrorInfo {
    let info = match input.into() {
        ErrorInput::Message(message) => {
            ErrorInfo::new(ErrorType::Unknown, ErrorSeverity::Medium, message)
        }
        ErrorInput::Classified(info) => info,
        ErrorInput::Transport(failure) => classify_transport(&failure),
        ErrorInput::Generic(err) => {
            let message = err.to_string();
            let message = if message.is_empty() {
                GENERIC_FALLBACK_MESSAGE.to_string()
            } else {
                message
            };
            ErrorInfo::new(ErrorType::Unknown, ErrorSeverity::Medium, message)
        }
    };

    overrides.apply(info)
}

fn classify_transport(failure: &TransportFailure) -> ErrorInfo {
    let (error_type, severity) = status_classification(failure.status);

    let message = failure
        .body_message()
        .or_else(|| (!failure.message.is_empty()).then(|| failure.message.clone()))
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());

    let mut info = ErrorInfo::new(error_type, severity, message);
    info.code = failure.status.map(ErrorCode::Status);

    log_debug!(
        url = %failure.url,
        status = ?failure.status,
        error_type = %error_type,
        severity = %severity,
        "Classified transport failure"
    );

    info
}

/// Human-readable text for a transport failure, tolerant of the body shapes
/// the backend produces (`{message}`, `{message: [..]}`, `{error}`, plain
/// string), falling back to wording keyed by status.
pub fn user_friendly_message(failure: &TransportFailure) -> String {
    let Some(status) = failure.status else {
        if failure.message.is_empty() {
            return "An unexpected error occurred. Please try again.".to_string();
        }
        if failure.code == Some(TransportErrorCode::Timeout) || failure.message.contains("timeout") {
            return "Request timeout. Please try again.".to_string();
        }
        if failure.code == Some(TransportErrorCode::Network)
            || failure.message.contains("Network Error")
        {
            return "Network error. Please check your connection.".to_string();
        }
        return failure.message.clone();
    };

    if let Some(message) = failure.body_message() {
        return message;
    }
    if let Some(Value::String(text)) = &failure.body {
        if !text.trim().is_empty() {
            return text.clone();
        }
    }

    match status {
        400 => "Bad request. Please check your input.".to_string(),
        401 => "You are not authorized. Please log in again.".to_string(),
        403 => "You do not have permission to perform this action.".to_string(),
        404 => "Resource not found.".to_string(),
        409 => "Conflict. This action cannot be completed.".to_string(),
        422 => "Validation error. Please check your input.".to_string(),
        500 => "Server error. Please try again later.".to_string(),
        503 => "Service unavailable. Please try again later.".to_string(),
        _ if !failure.message.is_empty() => failure.message.clone(),
        _ => "An unexpected error occurred.".to_string(),
    }
}

/// Log a failure with whatever context is available.
pub fn log_failure(failure: &TransportFailure, context: &str) {
    match failure.status {
        Some(status) => log_error!(
            context = context,
            status = status,
            method = %failure.method,
            url = %failure.url,
            body = ?failure.body,
            "HTTP error"
        ),
        None => log_error!(
            context = context,
            code = ?failure.code,
            method = %failure.method,
            url = %failure.url,
            message = %failure.message,
            "Network error"
        ),
    }
}
