//! Duplicate toast suppression
//!
//! Purely time-based: an error whose signature was shown less than the
//! window ago is dropped. Severity and occurrence counts are ignored.

use crate::config::DedupConfig;
use crate::core_types::ErrorInfo;
use crate::logging::log_trace;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::time::Instant;

/// Time-windowed registry of recently shown toast signatures.
#[derive(Debug)]
pub struct NotificationDeduper {
    config: DedupConfig,
    shown: Mutex<HashMap<String, Instant>>,
}

impl Default for NotificationDeduper {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}

impl NotificationDeduper {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            shown: Mutex::new(HashMap::new()),
        }
    }

    /// `TYPE:` followed by the first `signature_len` characters of the message.
    pub fn signature(&self, info: &ErrorInfo) -> String {
        let prefix: String = info.message.chars().take(self.config.signature_len).collect();
        format!("{}:{}", info.error_type, prefix)
    }

    pub fn should_show(&self, info: &ErrorInfo) -> bool {
        self.should_show_at(info, Instant::now())
    }

    /// Decide at `now`. Records the signature when returning `true`; a
    /// suppressed call leaves the stored timestamp untouched.
    pub fn should_show_at(&self, info: &ErrorInfo, now: Instant) -> bool {
        let key = self.signature(info);
        let mut shown = self.shown.lock();

        let retention = self.config.retention;
        shown.retain(|_, last| now.saturating_duration_since(*last) < retention);

        if let Some(last) = shown.get(&key) {
            if now.saturating_duration_since(*last) < self.config.window {
                log_trace!(signature = %key, "Suppressing duplicate toast");
                return false;
            }
        }

        shown.insert(key, now);
        true
    }

    /// Signatures currently remembered.
    pub fn tracked(&self) -> usize {
        self.shown.lock().len()
    }

    pub fn clear(&self) {
        self.shown.lock().clear();
    }
}
