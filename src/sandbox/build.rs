//! Build stage

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

use crate::sandbox::run::workspace_command;
use crate::sandbox::toolchain::ToolchainSpec;

/// Output of the build stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    pub stdout: String,
    pub stderr: String,
    /// Whether the compiler reported success
    pub succeeded: bool,
    /// Whether the declared artifact exists after the build
    pub artifact_present: bool,
}

impl BuildOutcome {
    /// A failed compiler with no artifact means there is nothing to run.
    /// A failed compiler that still left an artifact behind is run anyway.
    pub fn should_run(&self) -> bool {
        self.succeeded || self.artifact_present
    }

    fn skipped() -> Self {
        BuildOutcome {
            succeeded: true,
            artifact_present: true,
            ..Default::default()
        }
    }
}

/// Compile the workspace source if the recipe has a compile step
pub async fn build(workspace: &Path, spec: &ToolchainSpec, limit: Duration) -> BuildOutcome {
    let Some(compile) = &spec.compile else {
        return BuildOutcome::skipped();
    };

    debug!("Building with `{}`", compile);

    let mut command = workspace_command(workspace, compile, spec);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut outcome = BuildOutcome::default();

    match command.spawn() {
        Err(e) => {
            warn!("Failed to start compiler `{}`: {}", compile.program, e);
            outcome.stderr = format!("Build Error: failed to start {}: {}", compile.program, e);
        }
        Ok(child) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                outcome.succeeded = output.status.success();
                outcome.stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                outcome.stderr = String::from_utf8_lossy(&output.stderr).into_owned();

                // tsc and friends report errors on stdout
                if !outcome.succeeded && outcome.stderr.is_empty() {
                    outcome.stderr = if outcome.stdout.is_empty() {
                        format!("Build Error: `{}` exited with {}", compile.program, output.status)
                    } else {
                        outcome.stdout.clone()
                    };
                }
            }
            Ok(Err(e)) => {
                outcome.stderr = format!("Build Error: {}", e);
            }
            Err(_) => {
                // dropping the child future kills the compiler
                warn!("Build timed out after {:?}", limit);
                outcome.stderr = format!("Build Error: compilation exceeded {:?}", limit);
            }
        },
    }

    outcome.artifact_present = match &spec.artifact {
        Some(artifact) => tokio::fs::try_exists(workspace.join(artifact))
            .await
            .unwrap_or(false),
        None => outcome.succeeded,
    };

    debug!(
        "Build finished (success: {}, artifact present: {})",
        outcome.succeeded, outcome.artifact_present
    );
    outcome
}
