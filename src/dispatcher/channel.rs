//! Channel routing policy

use crate::core_types::ErrorSeverity;

/// Where a caller would like an error to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallerIntent {
    /// Let severity decide (toast unless critical).
    #[default]
    Default,
    /// Bottom-of-screen snackbar.
    Snackbar,
    /// Blocking presentation backed by the persistent list.
    Modal,
}

/// Presentation channel an error is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Toast,
    Snackbar,
    PersistentList,
}

/// Critical errors and explicit modal requests always go to the persistent
/// list; otherwise the caller's intent picks snackbar or toast.
pub fn resolve_channel(severity: ErrorSeverity, intent: CallerIntent) -> Channel {
    if intent == CallerIntent::Modal || severity == ErrorSeverity::Critical {
        return Channel::PersistentList;
    }
    match intent {
        CallerIntent::Snackbar => Channel::Snackbar,
        _ => Channel::Toast,
    }
}
