//! # Judgebox
//!
//! A code execution sandbox and test harness for automated grading.
//!
//! ## Features
//!
//! - **Multi-Language Toolchains:** Python, JavaScript, TypeScript, PHP, C, C++, Java and C#
//! - **Per-Execution Workspaces:** Every run gets its own scratch directory, removed on every exit path
//! - **Bounded Runs:** Wall-clock limits with kill-on-timeout and partial output capture
//! - **Scrubbed Output:** Host paths and account names never leave the sandbox
//! - **Test Harness:** Sequential grading against stored or supplied test cases
//! - **HTTP Service:** `POST /execute` and `POST /verify` for remote callers

pub mod config;
pub mod error;
pub mod harness;
pub mod sandbox;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
pub use harness::{Harness, TestCase, TestCaseResult, TestStatus, Verification};
pub use sandbox::{CodeExecutor, ExecutionRequest, ExecutionResult, Sandbox};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
