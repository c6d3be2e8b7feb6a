//! Error types for Judgebox

use thiserror::Error;

/// Result type alias using Judgebox's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Judgebox
///
/// Expected failures of a user program (compile errors, non-zero exits,
/// timeouts) are never errors; they are encoded in `ExecutionResult`.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Language is not in the toolchain registry
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Workspace could not be created or populated
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// Sandbox execution error
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    /// Toolchain discovery or warm-up error
    #[error("Toolchain error: {0}")]
    Toolchain(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedLanguage(_) | Error::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(Error::UnsupportedLanguage("cobol".into()).is_client_error());
        assert!(!Error::Sandbox("boom".into()).is_client_error());
        assert_eq!(
            Error::UnsupportedLanguage("cobol".into()).to_string(),
            "Unsupported language: cobol"
        );
    }
}
