//! Error types for agent-meter.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into four main categories:
//! - **Source**: A data source is unreachable, timed out, or answered non-200
//! - **Payload**: A source answered but the body could not be decoded
//! - **Configuration**: The config file is unreadable or malformed
//! - **Internal**: I/O, JSON and unclassified failures
//!
//! Each error has a stable error code (e.g., `METER-S001`) for programmatic handling.
//!
//! Inside a refresh cycle none of these are fatal: the collector boundary turns
//! every error into an empty contribution and a `warn!` line. Only the CLI
//! surfaces errors to the user (config file problems, mostly).

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Source unavailable (network, filesystem, missing directory, timeout).
    Source,
    /// Source answered but the payload was malformed.
    Payload,
    /// Configuration file problems.
    Configuration,
    /// Internal errors (I/O, bugs, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Source => "Source unavailable",
            Self::Payload => "Malformed payload",
            Self::Configuration => "Configuration error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Source => "S",
            Self::Payload => "P",
            Self::Configuration => "C",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Config or parse errors
    ParseError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for agent-meter operations.
#[derive(Error, Debug)]
pub enum MeterError {
    // ==========================================================================
    // Source errors (Category: Source)
    // ==========================================================================
    /// A collector call exceeded its time budget.
    #[error("request timeout after {seconds}s for {source_name}")]
    Timeout { source_name: String, seconds: u64 },

    /// Source answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Generic network error.
    #[error("network error: {0}")]
    Network(String),

    /// Log directory or file is missing.
    #[error("source path not found: {path}")]
    SourceMissing { path: String },

    // ==========================================================================
    // Payload errors (Category: Payload)
    // ==========================================================================
    /// Failed to parse a source response.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MeterError {
    /// Map error to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::ConfigParse { .. }
            | Self::ParseResponse(_)
            | Self::Json(_) => ExitCode::ParseError,

            Self::Timeout { .. } => ExitCode::Timeout,

            Self::HttpStatus { .. }
            | Self::Network(_)
            | Self::SourceMissing { .. }
            | Self::Io(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Timeout { .. }
            | Self::HttpStatus { .. }
            | Self::Network(_)
            | Self::SourceMissing { .. } => ErrorCategory::Source,

            Self::ParseResponse(_) => ErrorCategory::Payload,

            Self::ConfigParse { .. } => ErrorCategory::Configuration,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `METER-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "METER-S001",
            Self::HttpStatus { .. } => "METER-S002",
            Self::SourceMissing { .. } => "METER-S003",
            Self::Network(_) => "METER-S099",

            Self::ParseResponse(_) => "METER-P001",

            Self::ConfigParse { .. } => "METER-C001",

            Self::Io(_) => "METER-X001",
            Self::Json(_) => "METER-X002",
            Self::Other(_) => "METER-X099",
        }
    }

    /// Returns whether the error is transient and the next cycle may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Network(_) | Self::HttpStatus { status: 500.., .. }
        )
    }
}

/// Result type alias for agent-meter operations.
pub type Result<T> = std::result::Result<T, MeterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_category_code_prefix() {
        assert_eq!(ErrorCategory::Source.code_prefix(), "S");
        assert_eq!(ErrorCategory::Payload.code_prefix(), "P");
        assert_eq!(ErrorCategory::Configuration.code_prefix(), "C");
        assert_eq!(ErrorCategory::Internal.code_prefix(), "X");
    }

    #[test]
    fn source_errors_have_correct_category() {
        let err = MeterError::Timeout {
            source_name: "remote".to_string(),
            seconds: 10,
        };
        assert_eq!(err.category(), ErrorCategory::Source);
        assert_eq!(err.exit_code(), ExitCode::Timeout);

        let err = MeterError::HttpStatus {
            url: "http://localhost/api/usage".to_string(),
            status: 404,
        };
        assert_eq!(err.category(), ErrorCategory::Source);
        assert_eq!(err.error_code(), "METER-S002");
    }

    #[test]
    fn error_codes_start_with_category_prefix() {
        let errors = [
            MeterError::Network("reset".to_string()),
            MeterError::ParseResponse("bad".to_string()),
            MeterError::ConfigParse {
                path: "config.toml".to_string(),
                message: "expected `=`".to_string(),
            },
            MeterError::SourceMissing {
                path: "/nope".to_string(),
            },
        ];
        for err in errors {
            let code = err.error_code();
            let prefix = err.category().code_prefix();
            assert!(
                code.starts_with(&format!("METER-{prefix}")),
                "{code} should start with METER-{prefix}"
            );
        }
    }

    #[test]
    fn retryable_only_for_transient_failures() {
        assert!(MeterError::Network("reset".to_string()).is_retryable());
        assert!(
            MeterError::HttpStatus {
                url: String::new(),
                status: 503
            }
            .is_retryable()
        );
        assert!(
            !MeterError::HttpStatus {
                url: String::new(),
                status: 401
            }
            .is_retryable()
        );
        assert!(!MeterError::ParseResponse("x".to_string()).is_retryable());
    }

    #[test]
    fn display_includes_context() {
        let err = MeterError::ConfigParse {
            path: "/home/me/.config/agent-meter/config.toml".to_string(),
            message: "invalid type: string \"abc\", expected f64".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("config.toml"));
        assert!(text.contains("expected f64"));
        assert_eq!(err.exit_code(), ExitCode::ParseError);
    }
}
