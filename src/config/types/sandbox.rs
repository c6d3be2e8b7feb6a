//! Sandbox configuration types
//!
//! Configuration for the build/run sandbox and toolchain warm-up.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Directory under which per-execution workspaces are created
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
    /// Wall-clock budget for the run stage
    #[serde(with = "humantime_serde", default = "default_run_timeout")]
    pub run_timeout: Duration,
    /// Wall-clock budget for the build stage
    #[serde(with = "humantime_serde", default = "default_compile_timeout")]
    pub compile_timeout: Duration,
    /// .NET configuration
    #[serde(default)]
    pub dotnet: DotnetConfig,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            workspace_root: default_workspace_root(),
            run_timeout: default_run_timeout(),
            compile_timeout: default_compile_timeout(),
            dotnet: DotnetConfig::default(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_run_timeout() -> Duration {
    Duration::from_millis(3000)
}

fn default_compile_timeout() -> Duration {
    Duration::from_secs(30)
}

/// .NET toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DotnetConfig {
    /// Root of the .NET installation (contains `shared/` and `sdk/`)
    #[serde(default = "default_dotnet_root")]
    pub root: PathBuf,
    /// Where the reusable compiler reference list is cached
    #[serde(default = "default_dotnet_cache")]
    pub cache_dir: PathBuf,
}

impl Default for DotnetConfig {
    fn default() -> Self {
        DotnetConfig {
            root: default_dotnet_root(),
            cache_dir: default_dotnet_cache(),
        }
    }
}

fn default_dotnet_root() -> PathBuf {
    PathBuf::from("/usr/share/dotnet")
}

fn default_dotnet_cache() -> PathBuf {
    crate::config::cache_dir().join("dotnet")
}
