// Unit Tests for Logging Setup
//
// UNIT UNDER TEST: logging::default_directive, logging::init
//
// BUSINESS RESPONSIBILITY:
//   - Development builds log verbosely, production only errors
//   - Installing the subscriber twice is harmless
//
// TEST COVERAGE:
//   - Directive per build mode
//   - Repeated initialisation

use crate::config::BuildMode;
use crate::logging::{default_directive, init};

#[cfg(test)]
mod logging_setup_tests {
    use super::*;

    #[test]
    fn test_directive_per_build_mode() {
        assert_eq!(default_directive(BuildMode::Development), "debug");
        assert_eq!(default_directive(BuildMode::Production), "error");
    }

    #[test]
    #[serial_test::serial]
    fn test_second_init_reports_existing_subscriber() {
        // Arrange
        let _ = init(BuildMode::Production);

        // Act
        let second = init(BuildMode::Development);

        // Assert
        assert!(!second, "A global subscriber can only be installed once");
    }
}
