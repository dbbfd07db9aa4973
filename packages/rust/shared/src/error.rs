//! Error types for rankpages.
//!
//! Library crates use [`RankPagesError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all rankpages operations.
#[derive(Debug, thiserror::Error)]
pub enum RankPagesError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching the source page.
    #[error("network error: {0}")]
    Network(String),

    /// The ranking table was not present in the fetched markup.
    #[error("table `#{table_id}` not found in source page")]
    TableNotFound { table_id: String },

    /// Malformed table markup.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A prompt template references a field that records do not have.
    #[error("template `{template}` references unknown field `{field}`")]
    Template { template: String, field: String },

    /// A single conversational-service call failed.
    #[error("chat service error: {0}")]
    Service(String),

    /// The chat service kept failing until the retry budget ran out.
    #[error("chat service failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty record name, bad setting, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RankPagesError>;

impl RankPagesError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error came from a single chat call and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Service(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RankPagesError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = RankPagesError::TableNotFound {
            table_id: "top20".into(),
        };
        assert_eq!(err.to_string(), "table `#top20` not found in source page");

        let err = RankPagesError::RetriesExhausted {
            attempts: 5,
            last_error: "HTTP 503".into(),
        };
        assert!(err.to_string().contains("after 5 attempts"));
    }

    #[test]
    fn only_service_errors_are_retryable() {
        assert!(RankPagesError::Service("timeout".into()).is_retryable());
        assert!(
            !RankPagesError::Template {
                template: "{nope}".into(),
                field: "nope".into(),
            }
            .is_retryable()
        );
        assert!(!RankPagesError::Network("refused".into()).is_retryable());
    }
}
