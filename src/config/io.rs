//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (config.json / config.toml) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        // Try JSON5 first, then TOML
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, then overlays any set variables. Env vars have the
/// highest precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

fn apply_overrides_from<F>(config: &mut Config, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Sandbox overrides
    if let Some(root) = var("JUDGEBOX_WORKSPACE_ROOT") {
        config.sandbox.workspace_root = PathBuf::from(root);
    }
    if let Some(ms) = var("JUDGEBOX_RUN_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.sandbox.run_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = var("JUDGEBOX_COMPILE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.sandbox.compile_timeout = Duration::from_millis(ms);
    }
    if let Some(root) = var("JUDGEBOX_DOTNET_ROOT") {
        config.sandbox.dotnet.root = PathBuf::from(root);
    }

    // Server overrides
    if let Some(bind) = var("JUDGEBOX_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = var("JUDGEBOX_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = port;
    }

    // Harness overrides
    if let Some(url) = var("SANDBOX_URL") {
        config.harness.execution_url = Some(url);
    }
    if let Some(dir) = var("JUDGEBOX_TEST_CASES_DIR") {
        config.harness.test_cases_dir = PathBuf::from(dir);
    }
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}
