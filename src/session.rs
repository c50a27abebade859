//! Credential storage and navigation seams
//!
//! The dashboard keeps its session in browser storage and moves the user
//! around with page navigation. Both are external collaborators here:
//! [`CredentialStore`] holds tokens and identity fields, [`Navigator`]
//! performs redirects and reloads. [`SessionGuard`] combines them for the
//! terminal "clear everything and go to login" transition.

use crate::error::{ClientError, ClientResult};
use crate::logging::{log_debug, log_info, log_warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Individually addressable persisted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
    Email,
    Role,
    UserId,
    GroupId,
}

/// Snapshot of everything a session persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl Credentials {
    fn slot(&mut self, key: CredentialKey) -> &mut Option<String> {
        match key {
            CredentialKey::AccessToken => &mut self.access_token,
            CredentialKey::RefreshToken => &mut self.refresh_token,
            CredentialKey::Email => &mut self.email,
            CredentialKey::Role => &mut self.role,
            CredentialKey::UserId => &mut self.user_id,
            CredentialKey::GroupId => &mut self.group_id,
        }
    }

    /// Value for `key`; empty strings count as absent.
    pub fn get(&self, key: CredentialKey) -> Option<&str> {
        let value = match key {
            CredentialKey::AccessToken => &self.access_token,
            CredentialKey::RefreshToken => &self.refresh_token,
            CredentialKey::Email => &self.email,
            CredentialKey::Role => &self.role,
            CredentialKey::UserId => &self.user_id,
            CredentialKey::GroupId => &self.group_id,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }
}

/// Persisted session state.
///
/// Tokens are read before every request and written only by the refresh
/// coordinator (or the login flow outside this crate).
pub trait CredentialStore: Send + Sync + Debug {
    fn get(&self, key: CredentialKey) -> Option<String>;

    fn set(&self, key: CredentialKey, value: &str) -> ClientResult<()>;

    fn remove(&self, key: CredentialKey) -> ClientResult<()>;

    /// Drop every field.
    fn clear(&self) -> ClientResult<()>;

    fn access_token(&self) -> Option<String> {
        self.get(CredentialKey::AccessToken)
    }

    fn refresh_token(&self) -> Option<String> {
        self.get(CredentialKey::RefreshToken)
    }

    /// Persist a new access token and, when rotated, the refresh token.
    fn store_tokens(&self, access_token: &str, refresh_token: Option<&str>) -> ClientResult<()> {
        self.set(CredentialKey::AccessToken, access_token)?;
        if let Some(refresh_token) = refresh_token {
            self.set(CredentialKey::RefreshToken, refresh_token)?;
        }
        Ok(())
    }
}

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Credentials>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: RwLock::new(credentials),
        }
    }

    pub fn with_tokens(access_token: &str, refresh_token: Option<&str>) -> Self {
        Self::with_credentials(Credentials {
            access_token: Some(access_token.to_string()),
            refresh_token: refresh_token.map(str::to_string),
            ..Credentials::default()
        })
    }

    pub fn snapshot(&self) -> Credentials {
        self.inner.read().clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.inner.read().get(key).map(str::to_string)
    }

    fn set(&self, key: CredentialKey, value: &str) -> ClientResult<()> {
        *self.inner.write().slot(key) = Some(value.to_string());
        Ok(())
    }

    fn remove(&self, key: CredentialKey) -> ClientResult<()> {
        *self.inner.write().slot(key) = None;
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.inner.write() = Credentials::default();
        Ok(())
    }
}

/// JSON file store, rewritten on every mutation.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cache: RwLock<Credentials>,
}

impl FileCredentialStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::StorageError`] if the file exists but cannot be
    /// read or does not contain valid credentials JSON.
    pub fn open(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref().to_path_buf();
        let credentials = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                ClientError::storage_error(
                    format!("Failed to read {}", path.display()),
                    Some(Box::new(e)),
                )
            })?;
            if raw.trim().is_empty() {
                Credentials::default()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    ClientError::storage_error(
                        format!("Invalid credentials file {}", path.display()),
                        Some(Box::new(e)),
                    )
                })?
            }
        } else {
            Credentials::default()
        };

        log_debug!(
            path = %path.display(),
            has_access_token = credentials.access_token.is_some(),
            "Opened credential store"
        );

        Ok(Self {
            path,
            cache: RwLock::new(credentials),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_store(&self, credentials: &Credentials) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ClientError::storage_error(
                        format!("Failed to create {}", parent.display()),
                        Some(Box::new(e)),
                    )
                })?;
            }
        }
        let json = serde_json::to_string_pretty(credentials).map_err(|e| {
            ClientError::storage_error("Failed to encode credentials", Some(Box::new(e)))
        })?;
        std::fs::write(&self.path, json).map_err(|e| {
            ClientError::storage_error(
                format!("Failed to write {}", self.path.display()),
                Some(Box::new(e)),
            )
        })
    }

    fn mutate(&self, f: impl FnOnce(&mut Credentials)) -> ClientResult<()> {
        let mut cache = self.cache.write();
        let mut next = cache.clone();
        f(&mut next);
        self.write_store(&next)?;
        *cache = next;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.cache.read().get(key).map(str::to_string)
    }

    fn set(&self, key: CredentialKey, value: &str) -> ClientResult<()> {
        self.mutate(|c| *c.slot(key) = Some(value.to_string()))
    }

    fn remove(&self, key: CredentialKey) -> ClientResult<()> {
        self.mutate(|c| *c.slot(key) = None)
    }

    fn clear(&self) -> ClientResult<()> {
        self.mutate(|c| *c = Credentials::default())
    }
}

/// Page-level navigation performed on behalf of the error pipeline.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync + Debug {
    fn current_route(&self) -> String;

    fn redirect(&self, route: &str);

    /// Full reload, re-running every query on the page.
    fn reload(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    Redirect(String),
    Reload,
}

/// Navigator that only remembers what it was asked to do.
#[derive(Debug)]
pub struct RecordingNavigator {
    route: Mutex<String>,
    events: Mutex<Vec<NavigationEvent>>,
}

impl Default for RecordingNavigator {
    fn default() -> Self {
        Self::at("/")
    }
}

impl RecordingNavigator {
    pub fn at(route: impl Into<String>) -> Self {
        Self {
            route: Mutex::new(route.into()),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<NavigationEvent> {
        self.events.lock().clone()
    }

    pub fn redirects_to(&self, route: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, NavigationEvent::Redirect(r) if r == route))
            .count()
    }
}

impl Navigator for RecordingNavigator {
    fn current_route(&self) -> String {
        self.route.lock().clone()
    }

    fn redirect(&self, route: &str) {
        *self.route.lock() = route.to_string();
        self.events
            .lock()
            .push(NavigationEvent::Redirect(route.to_string()));
    }

    fn reload(&self) {
        self.events.lock().push(NavigationEvent::Reload);
    }
}

/// Terminal session handling shared by the refresh coordinator, the health
/// monitor's logout action and the client's connection lockout.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

impl SessionGuard {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            store,
            navigator,
            login_route: login_route.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Clear all credentials and send the user to login unless already there.
    pub fn end_session(&self, reason: &str) {
        if let Err(e) = self.store.clear() {
            log_warn!(error = %e, "Failed to clear credentials while ending session");
        }

        if self.navigator.current_route() != self.login_route {
            log_info!(reason = reason, route = %self.login_route, "Redirecting to login");
            self.navigator.redirect(&self.login_route);
        } else {
            log_debug!(reason = reason, "Already on login route, not redirecting");
        }
    }

    pub fn reload(&self) {
        self.navigator.reload();
    }
}
