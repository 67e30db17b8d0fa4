//! Error types for the binding layer.
//!
//! Initialization failures ([`MacmonError::LibraryNotFound`],
//! [`MacmonError::SymbolResolution`], [`MacmonError::ConstructionFailed`]) are
//! fatal for the binding instance. Per-call failures
//! ([`MacmonError::InfoUnavailable`], [`MacmonError::MetricsUnavailable`]) leave
//! the sampler usable and may be retried.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One failed attempt to open the native library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAttempt {
    /// The candidate as configured (e.g. `@executable_path/libmacmon.dylib`).
    pub candidate: String,
    /// Diagnostic text from path resolution or the platform loader.
    pub error: String,
}

impl fmt::Display for LoadAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tried {}: {}", self.candidate, self.error)
    }
}

fn render_attempts(attempts: &[LoadAttempt]) -> String {
    if attempts.is_empty() {
        return "no candidate paths configured".to_string();
    }
    attempts.iter().map(|a| format!("\n{a}")).collect()
}

/// Error type for binding operations.
#[derive(Debug, Error)]
pub enum MacmonError {
    /// No candidate path yielded an openable library.
    #[error("failed to load native library: {}", render_attempts(.attempts))]
    LibraryNotFound {
        /// Every attempt made, in search order.
        attempts: Vec<LoadAttempt>,
    },

    /// Required entry points are missing from an opened library.
    #[error("library {} is missing required symbols: {}", .path.display(), .missing.join(", "))]
    SymbolResolution {
        /// Library that was opened.
        path: PathBuf,
        /// Names of every missing entry point.
        missing: Vec<&'static str>,
    },

    /// The sampler constructor returned null.
    #[error("sampler_new in {} failed to create a sampler", .path.display())]
    ConstructionFailed {
        /// Library whose constructor failed.
        path: PathBuf,
    },

    /// The SoC info getter failed for one call.
    #[error("SoC info unavailable: {0}")]
    InfoUnavailable(String),

    /// The metrics getter failed for one call.
    #[error("metrics unavailable: {0}")]
    MetricsUnavailable(String),

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Error message describing why the value is invalid.
        message: String,
    },
}

impl MacmonError {
    /// Returns true if the failure is local to one call and safe to retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::InfoUnavailable(_) | Self::MetricsUnavailable(_))
    }
}

/// Result type alias for binding operations.
pub type Result<T> = std::result::Result<T, MacmonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_not_found_lists_every_attempt() {
        let err = MacmonError::LibraryNotFound {
            attempts: vec![
                LoadAttempt {
                    candidate: "libmacmon.dylib".to_string(),
                    error: "image not found".to_string(),
                },
                LoadAttempt {
                    candidate: "@executable_path/libmacmon.dylib".to_string(),
                    error: "no such file".to_string(),
                },
            ],
        };
        let display = err.to_string();

        assert!(
            display.contains("Tried libmacmon.dylib: image not found"),
            "Error should include first attempt: {}",
            display
        );
        assert!(
            display.contains("@executable_path/libmacmon.dylib"),
            "Error should include second attempt: {}",
            display
        );
    }

    #[test]
    fn test_library_not_found_without_candidates() {
        let err = MacmonError::LibraryNotFound { attempts: Vec::new() };
        assert!(err.to_string().contains("no candidate paths"));
    }

    #[test]
    fn test_symbol_resolution_names_missing_symbols() {
        let err = MacmonError::SymbolResolution {
            path: PathBuf::from("/opt/macmon/libmacmon.dylib"),
            missing: vec!["get_soc_info", "soc_info_free"],
        };
        let display = err.to_string();

        assert!(display.contains("/opt/macmon/libmacmon.dylib"));
        assert!(display.contains("get_soc_info, soc_info_free"), "{}", display);
    }

    #[test]
    fn test_only_per_call_errors_are_transient() {
        assert!(MacmonError::MetricsUnavailable("null".to_string()).is_transient());
        assert!(MacmonError::InfoUnavailable("null".to_string()).is_transient());
        assert!(!MacmonError::LibraryNotFound { attempts: Vec::new() }.is_transient());
        assert!(!MacmonError::ConstructionFailed { path: PathBuf::from("x") }.is_transient());
    }

    #[test]
    fn test_config_parse_error_includes_line_number() {
        let err = MacmonError::ConfigParse { line: 42, message: "invalid value".to_string() };
        let display = err.to_string();

        assert!(display.contains("42"), "Error should include line number: {}", display);
        assert!(display.contains("invalid value"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MacmonError>();
    }
}
