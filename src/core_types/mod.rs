//! Core types shared across the classifier, dispatcher and client
//!
//! ## Organization
//! - `errors` - classified error records and caller overrides

pub mod errors;

// Re-export commonly used types
pub use errors::{ErrorAction, ErrorCode, ErrorInfo, ErrorOverrides, ErrorSeverity, ErrorType};
