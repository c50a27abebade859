//! Test helper utilities for evco-http integration tests
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

// Allow dead code in test utilities - functions are used across different test files
#![allow(dead_code)]

use evco_http::{
    AdminHttpClient, ClientConfig, Credentials, MemoryCredentialStore, RecordingNavigator,
    RecordingSink,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// A client wired to recording collaborators so tests can inspect every side effect.
pub struct TestHarness {
    pub client: AdminHttpClient,
    pub store: Arc<MemoryCredentialStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub sink: Arc<RecordingSink>,
}

/// Config pointing at `base_url` with a short timeout so failures surface quickly.
pub fn test_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        request_timeout: Duration::from_secs(2),
        ..ClientConfig::with_base_url(base_url)
    }
}

pub fn harness_for(
    base_url: &str,
    access_token: Option<&str>,
    refresh_token: Option<&str>,
    route: &str,
) -> TestHarness {
    build_harness(test_config(base_url), access_token, refresh_token, route)
}

/// Harness whose requests give up after `timeout`.
pub fn harness_with_timeout(server: &MockServer, timeout: Duration) -> TestHarness {
    let config = ClientConfig {
        request_timeout: timeout,
        ..ClientConfig::with_base_url(server.uri())
    };
    build_harness(config, Some("access"), Some("refresh"), "/dashboard")
}

fn build_harness(
    config: ClientConfig,
    access_token: Option<&str>,
    refresh_token: Option<&str>,
    route: &str,
) -> TestHarness {
    let store = Arc::new(MemoryCredentialStore::with_credentials(Credentials {
        access_token: access_token.map(str::to_string),
        refresh_token: refresh_token.map(str::to_string),
        ..Credentials::default()
    }));
    let navigator = Arc::new(RecordingNavigator::at(route));
    let sink = Arc::new(RecordingSink::new());

    let client = AdminHttpClient::builder(config)
        .credential_store(store.clone())
        .navigator(navigator.clone())
        .notification_sink(sink.clone())
        .build()
        .expect("Test config should build a client");

    TestHarness {
        client,
        store,
        navigator,
        sink,
    }
}

pub fn harness(
    server: &MockServer,
    access_token: Option<&str>,
    refresh_token: Option<&str>,
) -> TestHarness {
    harness_for(&server.uri(), access_token, refresh_token, "/dashboard")
}

/// Base URL of a local port with nothing listening on it.
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
