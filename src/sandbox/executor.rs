//! Common executor trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request to execute code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Language identifier, matched against the toolchain registry
    pub language: String,
    /// Source code (plain text)
    pub source_code: String,
    /// Standard input
    #[serde(default)]
    pub stdin: String,
}

impl ExecutionRequest {
    /// Create a new execution request
    pub fn new(language: impl Into<String>, source_code: impl Into<String>) -> Self {
        ExecutionRequest {
            language: language.into(),
            source_code: source_code.into(),
            stdin: String::new(),
        }
    }

    /// Set stdin
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = stdin.into();
        self
    }
}

/// Result of code execution
///
/// Field names double as the execution service wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Compiler standard output
    #[serde(default)]
    pub build_stdout: String,
    /// Compiler standard error (diagnostics)
    #[serde(default)]
    pub build_stderr: String,
    /// Program standard output
    #[serde(default)]
    pub stdout: String,
    /// Program standard error
    #[serde(default)]
    pub stderr: String,
    /// Program exit code
    #[serde(default)]
    pub exit_code: i32,
}

/// Prefix of the stderr text that reports an infrastructure failure
pub const SYSTEM_ERROR_PREFIX: &str = "System Error: ";

impl ExecutionResult {
    /// A result carrying only an infrastructure failure message
    pub fn system_error(message: impl std::fmt::Display) -> Self {
        ExecutionResult {
            stderr: format!("{}{}", SYSTEM_ERROR_PREFIX, message),
            ..Default::default()
        }
    }

    /// The failure message if this is a result built by [`Self::system_error`]
    pub fn system_error_message(&self) -> Option<&str> {
        let untouched = self.build_stdout.is_empty()
            && self.build_stderr.is_empty()
            && self.stdout.is_empty()
            && self.exit_code == 0;
        if !untouched {
            return None;
        }
        self.stderr.strip_prefix(SYSTEM_ERROR_PREFIX)
    }
}

/// Trait for code execution backends
///
/// `Err` is reserved for infrastructure faults; a failing user program
/// is an `Ok` result with its diagnostics filled in.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Get the executor name
    fn name(&self) -> &str;

    /// Execute code
    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_request() {
        let req = ExecutionRequest::new("python", "print(input())").with_stdin("hello\n");

        assert_eq!(req.language, "python");
        assert_eq!(req.source_code, "print(input())");
        assert_eq!(req.stdin, "hello\n");
    }

    #[test]
    fn test_execution_result_wire_format() {
        let result: ExecutionResult =
            serde_json::from_str(r#"{ "stdout": "5\n", "exit_code": 0 }"#).unwrap();
        assert_eq!(result.stdout, "5\n");
        assert!(result.build_stderr.is_empty());
        assert_eq!(result.system_error_message(), None);

        let value = serde_json::to_value(ExecutionResult::system_error("disk full")).unwrap();
        assert_eq!(value["stderr"], "System Error: disk full");
        assert_eq!(value["build_stdout"], "");
    }

    #[test]
    fn test_system_error_message() {
        let failed = ExecutionResult::system_error("Unsupported language: cobol");
        assert_eq!(failed.system_error_message(), Some("Unsupported language: cobol"));

        // a program that prints the same text still produced output of its own
        let program = ExecutionResult {
            stdout: "partial".to_string(),
            stderr: "System Error: from the program".to_string(),
            exit_code: 1,
            ..Default::default()
        };
        assert_eq!(program.system_error_message(), None);
    }
}
