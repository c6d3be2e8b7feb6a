//! Configuration types module

pub mod sandbox;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sandbox configuration
    #[serde(default)]
    pub sandbox: sandbox::SandboxConfig,

    /// HTTP execution service configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Test harness configuration
    #[serde(default)]
    pub harness: HarnessConfig,
}

impl Config {
    /// Load configuration from defaults, the config file and environment
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// HTTP execution service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

/// Test harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Base URL of a remote execution service; in-process sandbox when unset
    #[serde(default)]
    pub execution_url: Option<String>,
    /// Per-request timeout when talking to a remote execution service
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Directory of stored problem files (`<problem_id>.json` / `.toml`)
    #[serde(default = "default_test_cases_dir")]
    pub test_cases_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            execution_url: None,
            request_timeout: default_request_timeout(),
            test_cases_dir: default_test_cases_dir(),
        }
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_test_cases_dir() -> PathBuf {
    crate::config::problems_dir()
}
