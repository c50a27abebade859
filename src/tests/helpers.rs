//! Test helper utilities for evco-http unit tests
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

#![allow(dead_code)]

use crate::classifier::{TransportErrorCode, TransportFailure};
use crate::dispatcher::RecordingSink;
use crate::session::{Credentials, MemoryCredentialStore, RecordingNavigator, SessionGuard};
use std::sync::Arc;

pub const TEST_URL: &str = "http://localhost:8080/api/groups";

/// A response-bearing failure with a JSON body.
pub fn http_failure(status: u16, body: &str) -> TransportFailure {
    TransportFailure::from_response("GET", TEST_URL, status, body)
}

/// Connection refused, no response.
pub fn network_failure() -> TransportFailure {
    TransportFailure::network(
        "GET",
        TEST_URL,
        "Network Error: connection refused",
        TransportErrorCode::Network,
    )
}

pub fn timeout_failure() -> TransportFailure {
    TransportFailure::network(
        "GET",
        TEST_URL,
        "timeout exceeded: 20000ms",
        TransportErrorCode::Timeout,
    )
}

/// Everything a session-touching test needs to inspect afterwards.
pub struct SessionFixture {
    pub store: Arc<MemoryCredentialStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub guard: SessionGuard,
}

pub fn session_fixture(access: Option<&str>, refresh: Option<&str>, route: &str) -> SessionFixture {
    let store = Arc::new(MemoryCredentialStore::with_credentials(Credentials {
        access_token: access.map(str::to_string),
        refresh_token: refresh.map(str::to_string),
        ..Credentials::default()
    }));
    let navigator = Arc::new(RecordingNavigator::at(route));
    let guard = SessionGuard::new(store.clone(), navigator.clone(), "/login");
    SessionFixture {
        store,
        navigator,
        guard,
    }
}

pub fn recording_sink() -> Arc<RecordingSink> {
    Arc::new(RecordingSink::new())
}
