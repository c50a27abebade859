use crate::classifier::{classify, log_failure, TransportErrorCode, TransportFailure};
use crate::config::ClientConfig;
use crate::core_types::{ErrorInfo, ErrorOverrides, ErrorSeverity, ErrorType};
use crate::dispatcher::{
    AutoClose, ErrorNotificationDispatcher, ErrorRegistry, NotificationSink, ToastOptions,
    TracingSink,
};
use crate::error::{ClientError, ClientResult};
use crate::health::{BackendHealthMonitor, ConsecutiveFailureCounter};
use crate::logging::{log_debug, log_warn};
use crate::refresh::{HttpTokenRefresher, TokenRefreshCoordinator, TokenRefresher};
use crate::session::{CredentialStore, MemoryCredentialStore, Navigator, RecordingNavigator, SessionGuard};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::time::Instant;

/// A request that can be replayed after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post(path: impl Into<String>, body: &impl Serialize) -> ClientResult<Self> {
        Self::new(Method::POST, path).with_json(body)
    }

    pub fn put(path: impl Into<String>, body: &impl Serialize) -> ClientResult<Self> {
        Self::new(Method::PUT, path).with_json(body)
    }

    pub fn with_json(mut self, body: &impl Serialize) -> ClientResult<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            ClientError::configuration_error(format!("Request body is not serializable: {e}"))
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// A 2xx response with its body read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            ClientError::response_parsing_error(format!("Invalid response body: {e}"))
        })
    }
}

/// Authenticated client for the admin REST API.
///
/// Every call attaches the stored access token, transparently refreshes it
/// on 401, feeds the health monitor, and surfaces failures through the
/// notification dispatcher before returning them to the caller.
#[derive(Debug)]
pub struct AdminHttpClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: SessionGuard,
    coordinator: TokenRefreshCoordinator,
    dispatcher: Arc<ErrorNotificationDispatcher>,
    health: Arc<BackendHealthMonitor>,
    lockout: Mutex<ConsecutiveFailureCounter>,
}

/// Builder for [`AdminHttpClient`]; every collaborator has a default.
#[derive(Debug)]
pub struct AdminHttpClientBuilder {
    config: ClientConfig,
    store: Option<Arc<dyn CredentialStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    sink: Option<Arc<dyn NotificationSink>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    registry: Option<Arc<ErrorRegistry>>,
}

impl AdminHttpClientBuilder {
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn token_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn error_registry(mut self, registry: Arc<ErrorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] if the configuration fails
    /// validation or the underlying HTTP client cannot be created.
    pub fn build(self) -> ClientResult<AdminHttpClient> {
        let config = self.config;
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::configuration_error(format!("Failed to build HTTP client: {e}")))?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(RecordingNavigator::default()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let registry = self.registry.unwrap_or_else(|| Arc::new(ErrorRegistry::new()));
        let refresher = self.refresher.unwrap_or_else(|| {
            Arc::new(HttpTokenRefresher::new(
                http.clone(),
                config.url_for(&config.refresh_path),
            ))
        });

        let session = SessionGuard::new(store, navigator, config.login_route.clone());
        let coordinator =
            TokenRefreshCoordinator::new(refresher, session.clone(), config.refresh_path.clone());
        let dispatcher = Arc::new(ErrorNotificationDispatcher::with_config(
            sink.clone(),
            registry,
            config.notifications.clone(),
            config.dedup.clone(),
        ));
        let health = Arc::new(
            BackendHealthMonitor::new(config.health.clone(), sink).with_session(session.clone()),
        );
        let lockout = Mutex::new(ConsecutiveFailureCounter::new(config.lockout.error_window));

        log_debug!(
            base_url = %config.base_url,
            request_timeout_ms = config.request_timeout.as_millis() as u64,
            "AdminHttpClient created"
        );

        Ok(AdminHttpClient {
            http,
            config,
            session,
            coordinator,
            dispatcher,
            health,
            lockout,
        })
    }
}

type PipelineFuture<'a> = Pin<Box<dyn Future<Output = ClientResult<ApiResponse>> + Send + 'a>>;

impl AdminHttpClient {
    pub fn builder(config: ClientConfig) -> AdminHttpClientBuilder {
        AdminHttpClientBuilder {
            config,
            store: None,
            navigator: None,
            sink: None,
            refresher: None,
            registry: None,
        }
    }

    /// Create a client using environment variables for configuration
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConfigurationError`] if the environment holds
    /// invalid values (see [`ClientConfig::from_env`]).
    pub fn from_env() -> ClientResult<Self> {
        Self::builder(ClientConfig::from_env()?).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    pub fn credential_store(&self) -> &Arc<dyn CredentialStore> {
        self.session.store()
    }

    pub fn coordinator(&self) -> &TokenRefreshCoordinator {
        &self.coordinator
    }

    pub fn dispatcher(&self) -> &Arc<ErrorNotificationDispatcher> {
        &self.dispatcher
    }

    pub fn health(&self) -> &Arc<BackendHealthMonitor> {
        &self.health
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        self.send(ApiRequest::post(path, body)?).await?.json()
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        self.send(ApiRequest::put(path, body)?).await?.json()
    }

    pub async fn delete(&self, path: &str) -> ClientResult<ApiResponse> {
        self.send(ApiRequest::delete(path)).await
    }

    /// Send `request` through the full pipeline.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`] for network failures and non-2xx
    ///   responses (already surfaced to the user unless exempt)
    /// - [`ClientError::AuthExpired`] / [`ClientError::RefreshFailed`] when
    ///   the session could not be recovered
    pub async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let url = self.config.url_for(&request.path);
        let token = self.session.store().access_token();

        match self.execute(&request, &url, token.as_deref()).await {
            Ok(response) => {
                self.on_success();
                Ok(response)
            }
            Err(failure) => self.on_failure(request, url, failure, false).await,
        }
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        url: &str,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, TransportFailure> {
        let method = request.method.as_str();
        let mut builder = self.http.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportFailure::from_reqwest(&e, method, url))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            let mut failure = TransportFailure::from_reqwest(&e, method, url);
            failure.status = Some(status.as_u16());
            failure
        })?;

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(TransportFailure::from_response(method, url, status.as_u16(), &body))
        }
    }

    fn on_success(&self) {
        self.health.record_success();
        self.lockout.lock().reset();
    }

    fn on_failure(
        &self,
        request: ApiRequest,
        url: String,
        failure: TransportFailure,
        retried: bool,
    ) -> PipelineFuture<'_> {
        Box::pin(async move {
            log_failure(&failure, "HTTP Request");
            self.health.record_error(&failure);

            if self.track_lockout(&failure) {
                let info = classify(failure.clone(), ErrorOverrides::none());
                return Err(ClientError::transport(failure, info));
            }

            if failure.status == Some(401) && !self.config.is_auth_endpoint(&url) {
                let token = self.coordinator.on_unauthorized(&url, retried).await?;
                log_debug!(url = %url, "Replaying request with refreshed token");
                let replay = self.execute(&request, &url, Some(&token)).await;
                return match replay {
                    Ok(response) => {
                        self.on_success();
                        Ok(response)
                    }
                    Err(failure) => self.on_failure(request, url, failure, true).await,
                };
            }

            let info = classify(failure.clone(), ErrorOverrides::none());
            if self.should_toast(&failure, &url) {
                self.toast_http_error(&failure, &url, &info);
            }
            Err(ClientError::transport(failure, info))
        })
    }

    /// Validation errors belong to forms; exempt endpoints render their own.
    fn should_toast(&self, failure: &TransportFailure, url: &str) -> bool {
        failure.status != Some(422) && !self.config.is_toast_exempt(url)
    }

    fn toast_http_error(&self, failure: &TransportFailure, url: &str, info: &ErrorInfo) {
        let notifications = &self.config.notifications;
        let auto_close = match info.severity {
            ErrorSeverity::Critical => AutoClose::Never,
            ErrorSeverity::High => AutoClose::After(notifications.http_high_toast_duration),
            _ => AutoClose::After(notifications.http_default_toast_duration),
        };
        let options = ToastOptions {
            toast_id: Some(format!("http-error-{url}-{}", failure.status.unwrap_or(0))),
            auto_close: Some(auto_close),
        };
        self.dispatcher.toast(info, options);
    }

    /// Count pure connectivity failures; once the lockout threshold is hit,
    /// drop the session so the user is not stuck with a dead token.
    ///
    /// Returns `true` when the lockout fired.
    fn track_lockout(&self, failure: &TransportFailure) -> bool {
        let mut lockout = self.lockout.lock();
        if !failure.is_connectivity_failure() {
            lockout.reset();
            return false;
        }

        let count = lockout.record(Instant::now());
        if count < self.config.lockout.error_threshold {
            return false;
        }
        lockout.reset();
        drop(lockout);

        log_warn!(
            consecutive_errors = count,
            code = ?failure.code.unwrap_or(TransportErrorCode::Other),
            "Backend unreachable, ending session"
        );

        if self.session.navigator().current_route() != self.config.login_route {
            let info = ErrorInfo::new(
                ErrorType::Network,
                ErrorSeverity::Critical,
                "Cannot connect to server. Please check your connection and try again.",
            )
            .with_title("Connection Lost")
            .with_retryable(false);
            self.dispatcher.toast(
                &info,
                ToastOptions {
                    toast_id: None,
                    auto_close: Some(AutoClose::After(self.config.notifications.http_default_toast_duration)),
                },
            );
        }
        self.session.end_session("backend unreachable");
        true
    }
}
