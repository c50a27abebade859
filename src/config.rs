use crate::error::{ClientError, ClientResult};
use crate::logging::log_debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Build flavour; controls log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for BuildMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ClientError::configuration_error(format!(
                "Unknown build mode: {other}. Expected development or production"
            ))),
        }
    }
}

/// Consecutive-failure detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Failures within the window that flip the state
    pub error_threshold: u32,
    /// A failure arriving later than this after the previous one restarts the count
    pub error_window: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            error_threshold: 3,
            error_window: Duration::from_secs(10),
        }
    }
}

impl HealthConfig {
    /// Client-level lockout: after this many pure network failures the
    /// session is dropped and the user sent back to login.
    pub fn session_lockout() -> Self {
        Self {
            error_threshold: 5,
            error_window: Duration::from_secs(30),
        }
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.error_threshold == 0 {
            return Err(ClientError::configuration_error(
                "Health error threshold must be at least 1",
            ));
        }
        if self.error_window.is_zero() {
            return Err(ClientError::configuration_error(
                "Health error window must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Toast de-duplication parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    pub window: Duration,
    pub retention: Duration,
    /// Characters of the message included in the signature
    pub signature_len: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(2000),
            retention: Duration::from_secs(10),
            signature_len: 50,
        }
    }
}

/// Auto-close durations per channel and severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub toast_duration: Duration,
    pub success_toast_duration: Duration,
    pub info_toast_duration: Duration,
    pub warning_toast_duration: Duration,
    pub snackbar_high_duration: Duration,
    pub snackbar_default_duration: Duration,
    pub snackbar_info_duration: Duration,
    pub snackbar_warning_duration: Duration,
    /// Toast durations used by the HTTP pipeline for high and lower severities
    pub http_high_toast_duration: Duration,
    pub http_default_toast_duration: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            toast_duration: Duration::from_millis(5000),
            success_toast_duration: Duration::from_millis(2500),
            info_toast_duration: Duration::from_millis(4000),
            warning_toast_duration: Duration::from_millis(5000),
            snackbar_high_duration: Duration::from_millis(5000),
            snackbar_default_duration: Duration::from_millis(3000),
            snackbar_info_duration: Duration::from_millis(4000),
            snackbar_warning_duration: Duration::from_millis(5000),
            http_high_toast_duration: Duration::from_millis(5000),
            http_default_toast_duration: Duration::from_millis(3000),
        }
    }
}

/// Admin API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Path of the refresh-token endpoint, relative to `base_url`
    pub refresh_path: String,
    /// Route the navigator is sent to on terminal auth failure
    pub login_route: String,
    /// Endpoints with their own error UI (uploads, OCR)
    pub toast_exempt_paths: Vec<String>,
    /// Auth forms surface their own errors
    pub auth_paths: Vec<String>,
    /// Endpoints that may legitimately be missing on older backends
    pub optional_paths: Vec<String>,
    pub build_mode: BuildMode,
    pub health: HealthConfig,
    pub lockout: HealthConfig,
    pub dedup: DedupConfig,
    pub notifications: NotificationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            request_timeout: Duration::from_secs(20),
            refresh_path: "/auth/refresh".to_string(),
            login_route: "/login".to_string(),
            toast_exempt_paths: vec![
                "/documents/upload-batch".to_string(),
                "/documents/preview-ocr".to_string(),
                "/groups/with-vehicle".to_string(),
                "/ocr/".to_string(),
            ],
            auth_paths: vec![
                "/auth/login".to_string(),
                "/auth/register".to_string(),
                "/auth/forgot-password".to_string(),
            ],
            optional_paths: vec!["/usage-report".to_string(), "/smart-insights".to_string()],
            build_mode: BuildMode::default(),
            health: HealthConfig::default(),
            lockout: HealthConfig::session_lockout(),
            dedup: DedupConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at `base_url` with every other field defaulted
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    /// This is the ONLY method that should access environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] if:
    /// - `EVCO_REQUEST_TIMEOUT_SECS` is not a positive integer
    /// - `EVCO_BUILD_MODE` is not `development` or `production`
    /// - The resulting configuration fails validation
    pub fn from_env() -> ClientResult<Self> {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("EVCO_API_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(timeout) = std::env::var("EVCO_REQUEST_TIMEOUT_SECS") {
            let secs = timeout.trim().parse::<u64>().map_err(|e| {
                ClientError::configuration_error(format!(
                    "Invalid EVCO_REQUEST_TIMEOUT_SECS '{timeout}': {e}"
                ))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(mode) = std::env::var("EVCO_BUILD_MODE") {
            config.build_mode = mode.parse()?;
        }

        config.validate()?;

        log_debug!(
            base_url = %config.base_url,
            request_timeout_secs = config.request_timeout.as_secs(),
            build_mode = ?config.build_mode,
            "Client configuration loaded from environment"
        );

        Ok(config)
    }

    /// Validate the configuration is complete
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] if the base URL is empty or
    /// not http(s), the timeout is zero, or a health threshold is zero.
    pub fn validate(&self) -> ClientResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::configuration_error("API base URL is required"));
        }
        let parsed = reqwest::Url::parse(&self.base_url).map_err(|e| {
            ClientError::configuration_error(format!("Invalid API base URL '{}': {e}", self.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::configuration_error(format!(
                "API base URL must use http or https, got {}",
                parsed.scheme()
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::configuration_error(
                "Request timeout must be non-zero",
            ));
        }
        if !self.refresh_path.starts_with('/') {
            return Err(ClientError::configuration_error(
                "Refresh path must start with '/'",
            ));
        }
        self.health.validate()?;
        self.lockout.validate()?;
        Ok(())
    }

    /// Absolute URL for an API path
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn is_refresh_endpoint(&self, url: &str) -> bool {
        url.contains(&self.refresh_path)
    }

    pub fn is_auth_endpoint(&self, url: &str) -> bool {
        self.auth_paths.iter().any(|p| url.contains(p.as_str()))
    }

    /// Endpoints whose failures never reach the global toast
    pub fn is_toast_exempt(&self, url: &str) -> bool {
        self.toast_exempt_paths
            .iter()
            .chain(self.optional_paths.iter())
            .any(|p| url.contains(p.as_str()))
            || self.is_auth_endpoint(url)
    }
}
