//! Persistent error list backing modal presentations

use crate::core_types::ErrorInfo;
use parking_lot::Mutex;

/// Errors accumulated until cleared by index or in bulk.
///
/// Share one instance (behind an `Arc`) across the process; the UI renders a
/// blocking presentation from [`errors`](Self::errors).
#[derive(Debug, Default)]
pub struct ErrorRegistry {
    errors: Mutex<Vec<ErrorInfo>>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and return the new entry's index.
    pub fn push(&self, info: ErrorInfo) -> usize {
        let mut errors = self.errors.lock();
        errors.push(info);
        errors.len() - 1
    }

    pub fn errors(&self) -> Vec<ErrorInfo> {
        self.errors.lock().clone()
    }

    /// Remove the entry at `index`; out-of-range indexes are ignored.
    pub fn clear(&self, index: usize) -> Option<ErrorInfo> {
        let mut errors = self.errors.lock();
        (index < errors.len()).then(|| errors.remove(index))
    }

    pub fn clear_all(&self) {
        self.errors.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }
}
