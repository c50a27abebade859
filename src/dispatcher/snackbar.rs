//! Bottom-of-screen snackbar stack
//!
//! Each snackbar expires on its own deadline; closing or triggering its
//! action removes it immediately. A zero duration never expires.

use crate::core_types::ErrorAction;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnackbarKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone)]
pub struct Snackbar {
    pub id: Uuid,
    pub message: String,
    pub kind: SnackbarKind,
    pub duration: Duration,
    pub action: Option<ErrorAction>,
    shown_at: Instant,
}

impl Snackbar {
    pub fn expires_at(&self) -> Option<Instant> {
        (!self.duration.is_zero()).then(|| self.shown_at + self.duration)
    }

    fn expired_at(&self, now: Instant) -> bool {
        self.expires_at().is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Debug, Default)]
pub struct SnackbarQueue {
    items: Mutex<Vec<Snackbar>>,
}

impl SnackbarQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &self,
        message: impl Into<String>,
        kind: SnackbarKind,
        duration: Duration,
        action: Option<ErrorAction>,
    ) -> Uuid {
        self.push_at(message, kind, duration, action, Instant::now())
    }

    pub fn push_at(
        &self,
        message: impl Into<String>,
        kind: SnackbarKind,
        duration: Duration,
        action: Option<ErrorAction>,
        now: Instant,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let mut items = self.items.lock();
        items.retain(|s| !s.expired_at(now));
        items.push(Snackbar {
            id,
            message: message.into(),
            kind,
            duration,
            action,
            shown_at: now,
        });
        id
    }

    #[cfg(test)]
    pub(crate) fn stored_len(&self) -> usize {
        self.items.lock().len()
    }

    /// Snackbars still on screen, oldest first (top of the stack first).
    pub fn visible(&self) -> Vec<Snackbar> {
        self.visible_at(Instant::now())
    }

    pub fn visible_at(&self, now: Instant) -> Vec<Snackbar> {
        let mut items = self.items.lock();
        items.retain(|s| !s.expired_at(now));
        items.clone()
    }

    pub fn close(&self, id: Uuid) -> bool {
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|s| s.id != id);
        items.len() != before
    }

    /// Run the snackbar's action, then remove it.
    pub fn trigger_action(&self, id: Uuid) -> bool {
        let action = {
            let mut items = self.items.lock();
            let Some(pos) = items.iter().position(|s| s.id == id) else {
                return false;
            };
            items.remove(pos).action
        };
        // Invoked outside the lock so the callback may touch the queue.
        if let Some(action) = action {
            action.invoke();
        }
        true
    }
}
