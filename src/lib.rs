//! # evco-http
//!
//! Error classification and notification plumbing for the EV co-ownership
//! admin API client.
//!
//! ## Key Features
//!
//! - **Classification**: Any failure becomes a typed [`ErrorInfo`] with severity and retryability
//! - **Token Refresh**: Concurrent 401s share a single refresh-token exchange
//! - **Backend Health**: Consecutive failures flip a "backend down" state with a blocking warning
//! - **Notifications**: Severity-routed toasts, snackbars and a persistent error list, de-duplicated
//!
//! ## Example
//!
//! ```rust,no_run
//! use evco_http::{AdminHttpClient, ClientConfig, MemoryCredentialStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::with_base_url("https://admin.example.com/api");
//! let client = AdminHttpClient::builder(config)
//!     .credential_store(Arc::new(MemoryCredentialStore::with_tokens("access", Some("refresh"))))
//!     .build()?;
//!
//! let groups: serde_json::Value = client.get_json("/groups").await?;
//! println!("{groups}");
//! # Ok(())
//! # }
//! ```

#![allow(clippy::missing_errors_doc)]

// Shared error records
pub mod core_types;

// Logging utilities (re-exports tracing with log_* naming)
pub mod logging;

pub mod classifier;
pub mod client;
pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod refresh;
pub mod session;

#[cfg(test)]
pub mod tests;

pub use classifier::{
    classify, status_classification, user_friendly_message, ErrorInput, TransportErrorCode,
    TransportFailure,
};
pub use client::{AdminHttpClient, AdminHttpClientBuilder, ApiRequest, ApiResponse};
pub use config::{BuildMode, ClientConfig, DedupConfig, HealthConfig, NotificationConfig};
pub use core_types::{
    ErrorAction, ErrorCode, ErrorInfo, ErrorOverrides, ErrorSeverity, ErrorType,
};
pub use dedup::NotificationDeduper;
pub use dispatcher::{
    AutoClose, CallerIntent, Channel, Dispatch, ErrorNotificationDispatcher, ErrorRegistry,
    NotificationSink, RecordingSink, Snackbar, SnackbarKind, SnackbarQueue, Toast, ToastIcon,
    ToastKind, ToastOptions, TracingSink,
};
pub use error::{ClientError, ClientResult};
pub use health::{
    BackendHealthMonitor, ConsecutiveFailureCounter, HealthAction, HealthState, HealthWarning,
};
pub use refresh::{
    HttpTokenRefresher, RefreshPhase, RefreshResponse, TokenRefreshCoordinator, TokenRefresher,
};
pub use session::{
    CredentialKey, CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore,
    NavigationEvent, Navigator, RecordingNavigator, SessionGuard,
};
