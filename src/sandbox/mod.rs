//! Sandbox module - code execution service
//!
//! One execution flows through:
//! - toolchain: language -> build/run recipe
//! - workspace: unique scratch directory, always removed
//! - build: optional compile step, artifact check
//! - run: spawn, stream, timeout-kill
//! - sanitize: scrub host paths and account name from all output
//!
//! The sandbox assumes it already runs inside an isolated host or
//! container; it orchestrates processes, it does not confine them.

mod build;
mod dotnet;
mod executor;
mod run;
mod sanitize;
mod toolchain;
mod workspace;

pub use build::{build, BuildOutcome};
pub use dotnet::{DotnetCompiler, DotnetWarmup};
pub use executor::{CodeExecutor, ExecutionRequest, ExecutionResult, SYSTEM_ERROR_PREFIX};
pub use run::{has_time_limit_notice, run, RunOutcome, TIME_LIMIT_PREFIX};
pub use sanitize::{Sanitizer, PATH_PLACEHOLDER, USER_PLACEHOLDER};
pub use toolchain::{
    CommandLine, Language, SourcePreprocessor, SupportFile, ToolchainRegistry, ToolchainSpec,
};
pub use workspace::Workspace;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SandboxConfig;
use crate::error::{Error, Result};

/// In-process execution service
pub struct Sandbox {
    registry: ToolchainRegistry,
    sanitizer: Sanitizer,
    workspace_root: PathBuf,
    run_timeout: Duration,
    compile_timeout: Duration,
}

impl Sandbox {
    /// Create a sandbox from configuration
    pub fn new(config: &SandboxConfig) -> Self {
        Sandbox {
            registry: ToolchainRegistry::new(config),
            sanitizer: Sanitizer::new(&config.workspace_root),
            workspace_root: config.workspace_root.clone(),
            run_timeout: config.run_timeout,
            compile_timeout: config.compile_timeout,
        }
    }

    /// Replace the sanitizer (tests, restricted hosts)
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn registry(&self) -> &ToolchainRegistry {
        &self.registry
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Build and run `source_code` in `language` against `stdin`
    pub async fn run_source(&self, language: &str, source_code: &str, stdin: &str) -> Result<ExecutionResult> {
        // unknown languages are rejected before any filesystem work
        let spec = self.registry.lookup(language).await?;
        self.execute_spec(&spec, source_code, stdin).await
    }

    /// Execute with an explicit recipe
    pub async fn execute_spec(
        &self,
        spec: &ToolchainSpec,
        source_code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult> {
        let workspace = Workspace::acquire(&self.workspace_root)
            .await
            .map_err(|e| self.scrub_error(e))?;

        let outcome = self.execute_in(&workspace, spec, source_code, stdin).await;
        workspace.release().await;

        let result = outcome.map_err(|e| self.scrub_error(e))?;
        Ok(self.sanitizer.sanitize_result(result))
    }

    async fn execute_in(
        &self,
        workspace: &Workspace,
        spec: &ToolchainSpec,
        source_code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult> {
        for file in &spec.support_files {
            workspace.write_file(&file.name, &file.contents).await?;
        }
        workspace
            .write_file(&spec.source_file, &spec.prepare_source(source_code))
            .await?;

        let mut result = ExecutionResult::default();

        let built = build(workspace.path(), spec, self.compile_timeout).await;
        result.build_stdout = built.stdout.clone();
        result.build_stderr = built.stderr.clone();
        if !built.should_run() {
            debug!("{} build failed, skipping run", spec.language);
            return Ok(result);
        }

        let ran = run(workspace.path(), spec, stdin, self.run_timeout).await;
        result.stdout = ran.stdout;
        result.stderr = ran.stderr;
        result.exit_code = ran.exit_code;

        info!(
            language = %spec.language,
            exit_code = result.exit_code,
            timed_out = ran.timed_out,
            "Execution finished"
        );
        Ok(result)
    }

    fn scrub_error(&self, error: Error) -> Error {
        match error {
            Error::UnsupportedLanguage(_) => error,
            other => Error::Sandbox(self.sanitizer.sanitize(&other.to_string())),
        }
    }
}

#[async_trait]
impl CodeExecutor for Sandbox {
    fn name(&self) -> &str {
        "local"
    }

    async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
        self.run_source(&request.language, &request.source_code, &request.stdin)
            .await
    }
}

/// Decode a source payload that may be base64.
///
/// Treated as base64 only when it round-trips exactly and decodes to UTF-8;
/// anything else is taken as plain source text.
pub fn decode_source(payload: &str) -> String {
    if payload.trim().is_empty() {
        return payload.to_string();
    }

    match STANDARD.decode(payload) {
        Ok(bytes) if STANDARD.encode(&bytes) == payload => {
            String::from_utf8(bytes).unwrap_or_else(|_| payload.to_string())
        }
        _ => payload.to_string(),
    }
}

/// Encode source for transport to an execution service
pub fn encode_source(source: &str) -> String {
    STANDARD.encode(source.as_bytes())
}
