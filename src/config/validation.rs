//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_sandbox_config(config, result);
    result = validate_server_config(config, result);
    result = validate_harness_config(config, result);

    result
}

fn validate_sandbox_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.sandbox.run_timeout.is_zero() {
        result = result.with_error(
            ValidationIssue::new("sandbox.run_timeout", "Run timeout must be greater than zero")
                .with_suggestion("Use the default of 3s"),
        );
    }

    if config.sandbox.compile_timeout.is_zero() {
        result = result.with_error(ValidationIssue::new(
            "sandbox.compile_timeout",
            "Compile timeout must be greater than zero",
        ));
    }

    if !config.sandbox.workspace_root.is_dir() {
        result = result.with_error(
            ValidationIssue::new(
                "sandbox.workspace_root",
                format!(
                    "Workspace root does not exist: {}",
                    config.sandbox.workspace_root.display()
                ),
            )
            .with_suggestion("Create the directory or change sandbox.workspace_root"),
        );
    }

    if !config.sandbox.dotnet.root.is_dir() {
        result = result.with_warning(ValidationIssue::new(
            "sandbox.dotnet.root",
            format!(
                ".NET root not found at {}; C# submissions will fail to build",
                config.sandbox.dotnet.root.display()
            ),
        ));
    }

    result
}

fn validate_server_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.server.port == 0 {
        result = result.with_error(ValidationIssue::new("server.port", "Port must not be 0"));
    }

    if config.server.bind.parse::<std::net::IpAddr>().is_err() {
        result = result.with_error(ValidationIssue::new(
            "server.bind",
            format!("Invalid bind address: {}", config.server.bind),
        ));
    }

    result
}

fn validate_harness_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if let Some(raw) = &config.harness.execution_url {
        match url::Url::parse(raw) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                result = result.with_error(ValidationIssue::new(
                    "harness.execution_url",
                    format!("Unsupported URL scheme: {}", parsed.scheme()),
                ));
            }
            Err(e) => {
                result = result.with_error(
                    ValidationIssue::new(
                        "harness.execution_url",
                        format!("Invalid execution service URL: {}", e),
                    )
                    .with_suggestion("Set SANDBOX_URL to e.g. http://127.0.0.1:4000"),
                );
            }
        }
    }

    if !config.harness.test_cases_dir.is_dir() {
        result = result.with_warning(ValidationIssue::new(
            "harness.test_cases_dir",
            format!(
                "Stored test case directory does not exist: {}",
                config.harness.test_cases_dir.display()
            ),
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = validate_config(&config);

        // Default config may warn about missing directories but has no errors
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(result.valid);
    }

    #[test]
    fn test_zero_timeout_is_an_error() {
        let mut config = Config::default();
        config.sandbox.run_timeout = Duration::ZERO;
        let result = validate_config(&config);
        assert!(!result.valid);
        assert_eq!(result.errors[0].path, "sandbox.run_timeout");
    }

    #[test]
    fn test_bad_execution_url() {
        let mut config = Config::default();
        config.harness.execution_url = Some("not a url".to_string());
        let result = validate_config(&config);
        assert!(result.errors.iter().any(|e| e.path == "harness.execution_url"));

        config.harness.execution_url = Some("ftp://sandbox".to_string());
        let result = validate_config(&config);
        assert!(result.errors.iter().any(|e| e.path == "harness.execution_url"));
    }
}
