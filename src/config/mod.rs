//! Configuration module
//!
//! - types/mod.rs: Core configuration types (Config, ServerConfig, HarnessConfig)
//! - types/sandbox.rs: Sandbox/execution configuration
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Config, state, problem and cache directories

mod io;
mod paths;
mod types;
mod validation;

pub use types::{Config, HarnessConfig, ServerConfig};
pub use types::sandbox::{DotnetConfig, SandboxConfig};

pub use io::{apply_env_overrides, load_config, load_config_from_path, save_config};
pub use paths::{cache_dir, config_dir, config_path, problems_dir, state_dir};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
