//! Run stage
//!
//! Spawns the program inside the workspace, feeds it stdin, pumps its
//! output incrementally and races its exit against the wall-clock limit.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::sandbox::toolchain::{CommandLine, ToolchainSpec};

/// Grace period for draining pipes after the process exits
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Start of the notice appended to stderr when a run is killed for exceeding its limit
pub const TIME_LIMIT_PREFIX: &str = "\nError: Time Limit Exceeded (";

/// Output of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

/// Build a command for `line` with the workspace as working directory
pub(crate) fn workspace_command(workspace: &Path, line: &CommandLine, spec: &ToolchainSpec) -> Command {
    // `./app` must resolve against the workspace, not our own cwd
    let program = match line.program.strip_prefix("./") {
        Some(relative) => workspace.join(relative).into_os_string(),
        None => line.program.clone().into(),
    };

    let mut command = Command::new(program);
    command
        .args(&line.args)
        .current_dir(workspace)
        .kill_on_drop(true);

    for (key, value) in &spec.env {
        command.env(key, value);
    }
    if spec.home_in_workspace {
        command.env("HOME", workspace).env("DOTNET_CLI_HOME", workspace);
    }
    command
}

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

fn pump<R>(mut reader: R, sink: SharedBuffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => sink
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .extend_from_slice(&chunk[..n]),
            }
        }
    })
}

fn snapshot(buffer: &SharedBuffer) -> String {
    let bytes = buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    String::from_utf8_lossy(&bytes).into_owned()
}

fn limit_label(limit: Duration) -> String {
    let millis = limit.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

fn time_limit_notice(limit: Duration) -> String {
    format!("{}{})", TIME_LIMIT_PREFIX, limit_label(limit))
}

/// Whether `stderr` ends with the notice a timeout kill appends
pub fn has_time_limit_notice(stderr: &str) -> bool {
    stderr
        .rsplit_once(TIME_LIMIT_PREFIX)
        .map_or(false, |(_, label)| {
            label.len() > 1 && label.ends_with(')') && !label.contains(['\n', '('])
        })
}

/// Run the recipe's program in `workspace`
pub async fn run(workspace: &Path, spec: &ToolchainSpec, stdin: &str, limit: Duration) -> RunOutcome {
    let mut outcome = RunOutcome::default();

    let mut command = workspace_command(workspace, &spec.run, spec);
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("Running `{}` (limit {:?})", spec.run, limit);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            // exit code intentionally stays at its default
            warn!("Failed to spawn `{}`: {}", spec.run.program, e);
            outcome.stderr.push_str(&format!("\nSpawn Error: {}", e));
            return outcome;
        }
    };

    let deadline = Instant::now() + limit;

    let feeder = child.stdin.take().map(|mut pipe| {
        let input = stdin.to_owned();
        tokio::spawn(async move {
            if !input.is_empty() {
                // a program that exits without reading closes the pipe on us
                let _ = pipe.write_all(input.as_bytes()).await;
            }
            let _ = pipe.shutdown().await;
        })
    });

    let stdout_buf = SharedBuffer::default();
    let stderr_buf = SharedBuffer::default();
    let mut readers = Vec::with_capacity(2);
    if let Some(out) = child.stdout.take() {
        readers.push(pump(out, stdout_buf.clone()));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(pump(err, stderr_buf.clone()));
    }

    match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(Ok(status)) => {
            let drain_deadline = deadline.max(Instant::now() + DRAIN_GRACE);
            for reader in &mut readers {
                if tokio::time::timeout_at(drain_deadline, &mut *reader).await.is_err() {
                    debug!("Output pipe still open after exit; abandoning reader");
                    break;
                }
            }
            outcome.exit_code = status.code().unwrap_or(0);
        }
        Ok(Err(e)) => {
            warn!("Failed to wait for `{}`: {}", spec.run.program, e);
            outcome.stderr.push_str(&format!("\nWait Error: {}", e));
        }
        Err(_) => {
            warn!("Execution timed out after {:?}", limit);
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill timed out process: {}", e);
            }
            // reap without letting a stuck kill hold us up
            let _ = tokio::time::timeout(DRAIN_GRACE, child.wait()).await;
            outcome.timed_out = true;
        }
    }

    for reader in &readers {
        reader.abort();
    }
    if let Some(feeder) = feeder {
        feeder.abort();
    }

    outcome.stdout = snapshot(&stdout_buf);
    let captured_stderr = snapshot(&stderr_buf);
    outcome.stderr = captured_stderr + &outcome.stderr;
    if outcome.timed_out {
        outcome.stderr.push_str(&time_limit_notice(limit));
    }

    debug!(
        "Run finished (exit {}, {} bytes stdout, {} bytes stderr)",
        outcome.exit_code,
        outcome.stdout.len(),
        outcome.stderr.len()
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::toolchain::Language;
    use tempfile::tempdir;

    fn shell(script: &str) -> ToolchainSpec {
        ToolchainSpec {
            language: Language::Python,
            source_file: "main.sh".to_string(),
            compile: None,
            artifact: None,
            run: CommandLine::new("sh", ["-c", script]),
            preprocessor: None,
            support_files: Vec::new(),
            env: Vec::new(),
            home_in_workspace: false,
        }
    }

    #[tokio::test]
    async fn test_echo_stdin() {
        let dir = tempdir().unwrap();
        let outcome = run(dir.path(), &shell("cat"), "hello\n", Duration::from_secs(3)).await;

        assert_eq!(outcome.stdout.trim(), "hello");
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stderr.is_empty());
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn test_empty_stdin_is_closed() {
        let dir = tempdir().unwrap();
        let outcome = run(dir.path(), &shell("cat; echo done"), "", Duration::from_secs(3)).await;
        assert_eq!(outcome.stdout.trim(), "done");
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn test_exit_code_and_stderr() {
        let dir = tempdir().unwrap();
        let outcome = run(
            dir.path(),
            &shell("echo oops >&2; exit 3"),
            "",
            Duration::from_secs(3),
        )
        .await;

        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_output() {
        let dir = tempdir().unwrap();
        let started = std::time::Instant::now();
        let outcome = run(
            dir.path(),
            &shell("echo early; sleep 10; echo late"),
            "",
            Duration::from_millis(500),
        )
        .await;

        assert!(outcome.timed_out);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.stdout.trim(), "early");
        assert!(outcome.stderr.ends_with("\nError: Time Limit Exceeded (500ms)"));
        assert!(has_time_limit_notice(&outcome.stderr));
    }

    #[tokio::test]
    async fn test_spawn_failure_keeps_zero_exit_code() {
        let dir = tempdir().unwrap();
        let mut spec = shell("");
        spec.run = CommandLine::new("judgebox-no-such-interpreter", ["main.x"]);

        let outcome = run(dir.path(), &spec, "input\n", Duration::from_secs(1)).await;
        assert!(outcome.stderr.starts_with("\nSpawn Error: "));
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_runs_inside_workspace_with_env() {
        let dir = tempdir().unwrap();
        let mut spec = shell("pwd; echo $JUDGEBOX_PROBE; echo $HOME");
        spec.env.push(("JUDGEBOX_PROBE".to_string(), "probe".to_string()));
        spec.home_in_workspace = true;

        let outcome = run(dir.path(), &spec, "", Duration::from_secs(3)).await;
        let lines: Vec<&str> = outcome.stdout.lines().collect();
        let workspace = dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(lines[0]).canonicalize().unwrap(), workspace);
        assert_eq!(lines[1], "probe");
        assert_eq!(Path::new(lines[2]), dir.path());
    }

    #[tokio::test]
    async fn test_relative_program_resolves_in_workspace() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("app");
        std::fs::write(&script, "#!/bin/sh\necho from-app\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let mut spec = shell("");
        spec.run = CommandLine::new("./app", Vec::<String>::new());
        let outcome = run(dir.path(), &spec, "", Duration::from_secs(3)).await;
        assert_eq!(outcome.stdout.trim(), "from-app");
    }

    #[test]
    fn test_limit_label() {
        assert_eq!(limit_label(Duration::from_millis(3000)), "3s");
        assert_eq!(limit_label(Duration::from_millis(1500)), "1500ms");
        assert_eq!(
            time_limit_notice(Duration::from_millis(3000)),
            "\nError: Time Limit Exceeded (3s)"
        );
    }

    #[test]
    fn test_time_limit_notice_detection() {
        assert!(has_time_limit_notice("partial\nError: Time Limit Exceeded (3s)"));
        assert!(has_time_limit_notice("\nError: Time Limit Exceeded (1500ms)"));

        // the phrase alone, or followed by more output, is program text
        assert!(!has_time_limit_notice("Time Limit Exceeded"));
        assert!(!has_time_limit_notice("Error: Time Limit Exceeded (3s)"));
        assert!(!has_time_limit_notice(
            "\nError: Time Limit Exceeded (3s)\nTraceback (most recent call last)"
        ));
    }
}
