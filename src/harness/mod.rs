//! Test harness
//!
//! Drives an executor across a problem's test cases, one case at a time,
//! and turns the raw results into per-case verdicts plus an aggregate.

mod client;
mod source;
mod types;

pub use client::HttpExecutor;
pub use source::{load_case_file, FileTestCases, InMemoryTestCases, TestCaseSource};
pub use types::{TestCase, TestCaseResult, TestStatus, Verification};

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::Result;
use crate::sandbox::{
    has_time_limit_notice, CodeExecutor, ExecutionRequest, ExecutionResult, Sandbox,
};

/// Grades submissions against stored or supplied test cases
#[derive(Clone)]
pub struct Harness {
    executor: Arc<dyn CodeExecutor>,
    source: Arc<dyn TestCaseSource>,
}

impl Harness {
    pub fn new(executor: Arc<dyn CodeExecutor>, source: Arc<dyn TestCaseSource>) -> Self {
        Harness { executor, source }
    }

    /// Harness wired from configuration: remote executor when an execution
    /// URL is set, otherwise an in-process sandbox
    pub fn from_config(config: &Config) -> Result<Self> {
        let executor: Arc<dyn CodeExecutor> = match &config.harness.execution_url {
            Some(url) => Arc::new(HttpExecutor::new(url.clone(), config.harness.request_timeout)?),
            None => Arc::new(Sandbox::new(&config.sandbox)),
        };
        let source = Arc::new(FileTestCases::new(config.harness.test_cases_dir.clone()));
        Ok(Harness::new(executor, source))
    }

    pub fn executor(&self) -> &Arc<dyn CodeExecutor> {
        &self.executor
    }

    /// Run `source_code` against the supplied cases, or the stored ones for
    /// `problem_id` when none are supplied
    pub async fn verify(
        &self,
        language: &str,
        source_code: &str,
        problem_id: i64,
        test_cases: Option<Vec<TestCase>>,
    ) -> Verification {
        let cases = match self.resolve_cases(problem_id, test_cases).await {
            Ok(cases) => cases,
            Err(e) => {
                error!("Failed to load test cases for problem {}: {}", problem_id, e);
                return Verification::failed(Verification::INTERNAL_ERROR);
            }
        };

        if cases.is_empty() {
            info!("No test cases found for problem {}", problem_id);
            return Verification::failed(Verification::NO_TEST_CASES);
        }

        debug!(
            "Verifying {} submission for problem {} against {} cases via {}",
            language,
            problem_id,
            cases.len(),
            self.executor.name()
        );

        // one case at a time bounds sandbox load per submission
        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            let request = ExecutionRequest::new(language, source_code)
                .with_stdin(case.normalized_input());
            let outcome = self.executor.execute(request).await;
            results.push(classify(case, outcome));
        }

        let verification = Verification::from_results(results);
        info!(
            problem_id,
            passed = verification.passed_count,
            total = verification.total_count,
            "Verification finished"
        );
        verification
    }

    async fn resolve_cases(
        &self,
        problem_id: i64,
        supplied: Option<Vec<TestCase>>,
    ) -> Result<Vec<TestCase>> {
        if let Some(cases) = supplied.filter(|cases| !cases.is_empty()) {
            return Ok(cases);
        }

        let stored = self.source.test_cases(problem_id).await?;
        if !stored.is_empty() {
            return Ok(stored);
        }

        debug!("Problem {} has no test cases, using sample cases", problem_id);
        self.source.sample_cases(problem_id).await
    }
}

/// Turn one execution outcome into a verdict
pub fn classify(case: TestCase, outcome: Result<ExecutionResult>) -> TestCaseResult {
    let (status, actual_output) = match outcome {
        Err(e) => (TestStatus::SystemError, e.to_string()),
        Ok(result) if !result.build_stderr.is_empty() => {
            (TestStatus::CompilationError, result.build_stderr)
        }
        Ok(result) if has_time_limit_notice(&result.stderr) => {
            (TestStatus::TimeLimitExceeded, result.stderr)
        }
        Ok(result) if !result.stderr.is_empty() => (TestStatus::RuntimeError, result.stderr),
        Ok(result) => {
            let actual = result.stdout.trim().to_string();
            let status = if actual == case.expected_output.trim() {
                TestStatus::Accepted
            } else {
                TestStatus::WrongAnswer
            };
            (status, actual)
        }
    };

    TestCaseResult {
        name: case.display_name().to_string(),
        input: case.input,
        expected_output: case.expected_output,
        actual_output,
        is_correct: status.is_accepted(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SandboxConfig;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Executor that answers with a fixed function of the request
    struct ScriptedExecutor<F> {
        respond: F,
        calls: AtomicUsize,
    }

    impl<F> ScriptedExecutor<F>
    where
        F: Fn(&ExecutionRequest) -> Result<ExecutionResult> + Send + Sync,
    {
        fn new(respond: F) -> Self {
            ScriptedExecutor {
                respond,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl<F> CodeExecutor for ScriptedExecutor<F>
    where
        F: Fn(&ExecutionRequest) -> Result<ExecutionResult> + Send + Sync,
    {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)(&request)
        }
    }

    fn echo_executor() -> Arc<ScriptedExecutor<impl Fn(&ExecutionRequest) -> Result<ExecutionResult> + Send + Sync>> {
        Arc::new(ScriptedExecutor::new(|request: &ExecutionRequest| {
            Ok(ExecutionResult {
                stdout: request.stdin.clone(),
                ..Default::default()
            })
        }))
    }

    fn harness_with(executor: Arc<dyn CodeExecutor>, source: InMemoryTestCases) -> Harness {
        Harness::new(executor, Arc::new(source))
    }

    #[tokio::test]
    async fn test_supplied_cases_all_accepted() {
        let harness = harness_with(echo_executor(), InMemoryTestCases::new());
        let cases = vec![TestCase::new("5", "5"), TestCase::new("7\n", "7 ")];

        let verification = harness.verify("python", "", 1, Some(cases)).await;
        assert!(verification.success);
        assert_eq!(verification.message, "All test cases passed.");
        assert_eq!(verification.passed_count, 2);
        assert!(verification
            .test_case_results
            .iter()
            .all(|r| r.status == TestStatus::Accepted && r.name == "Test Case"));
    }

    #[tokio::test]
    async fn test_input_is_newline_terminated() {
        let executor = Arc::new(ScriptedExecutor::new(|request: &ExecutionRequest| {
            Ok(ExecutionResult {
                stdout: if request.stdin == "2 3\n" { "ok" } else { "bad" }.to_string(),
                ..Default::default()
            })
        }));
        let harness = harness_with(executor, InMemoryTestCases::new());

        let verification = harness
            .verify("python", "", 1, Some(vec![TestCase::new("2 3", "ok")]))
            .await;
        assert!(verification.success);
    }

    #[tokio::test]
    async fn test_wrong_answer_and_summary() {
        let harness = harness_with(echo_executor(), InMemoryTestCases::new());
        let cases = vec![TestCase::new("1", "1"), TestCase::new("2", "3").named("Edge")];

        let verification = harness.verify("python", "", 1, Some(cases)).await;
        assert!(!verification.success);
        assert_eq!(verification.message, "Some test cases failed. (1/2 passed)");

        let failed = &verification.test_case_results[1];
        assert_eq!(failed.status, TestStatus::WrongAnswer);
        assert_eq!(failed.name, "Edge");
        assert_eq!(failed.actual_output, "2");
        assert!(!failed.is_correct);
    }

    #[tokio::test]
    async fn test_stored_cases_then_samples() {
        let source = InMemoryTestCases::new()
            .with_test_cases(1, vec![TestCase::new("1", "1").named("Test Case 1")])
            .with_sample_cases(2, vec![TestCase::new("2", "2").named("Sample Case 1")]);
        let harness = harness_with(echo_executor(), source);

        let stored = harness.verify("python", "", 1, None).await;
        assert_eq!(stored.test_case_results[0].name, "Test Case 1");

        let samples = harness.verify("python", "", 2, Some(Vec::new())).await;
        assert!(samples.success);
        assert_eq!(samples.test_case_results[0].name, "Sample Case 1");
    }

    #[tokio::test]
    async fn test_no_cases_found() {
        let executor = echo_executor();
        let harness = harness_with(executor.clone(), InMemoryTestCases::new());

        let verification = harness.verify("python", "", 99, None).await;
        assert!(!verification.success);
        assert_eq!(verification.message, "No test cases found.");
        assert!(verification.test_case_results.is_empty());
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_source_failure_is_internal_error() {
        struct BrokenSource;

        #[async_trait]
        impl TestCaseSource for BrokenSource {
            async fn test_cases(&self, _problem_id: i64) -> Result<Vec<TestCase>> {
                Err(Error::Internal("database unavailable".to_string()))
            }

            async fn sample_cases(&self, _problem_id: i64) -> Result<Vec<TestCase>> {
                Ok(Vec::new())
            }
        }

        let harness = Harness::new(echo_executor(), Arc::new(BrokenSource));
        let verification = harness.verify("python", "", 1, None).await;
        assert_eq!(verification.message, Verification::INTERNAL_ERROR);
        assert!(verification.test_case_results.is_empty());
    }

    #[tokio::test]
    async fn test_executor_error_does_not_stop_other_cases() {
        let executor = Arc::new(ScriptedExecutor::new(|request: &ExecutionRequest| {
            if request.stdin.starts_with("boom") {
                Err(Error::Sandbox("connection refused".to_string()))
            } else {
                Ok(ExecutionResult {
                    stdout: request.stdin.clone(),
                    ..Default::default()
                })
            }
        }));
        let harness = harness_with(executor.clone(), InMemoryTestCases::new());
        let cases = vec![TestCase::new("boom", "x"), TestCase::new("ok", "ok")];

        let verification = harness.verify("python", "", 1, Some(cases)).await;
        assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(verification.test_case_results[0].status, TestStatus::SystemError);
        assert!(verification.test_case_results[0]
            .actual_output
            .contains("connection refused"));
        assert_eq!(verification.test_case_results[1].status, TestStatus::Accepted);
    }

    #[test]
    fn test_from_config_picks_executor() {
        let mut config = Config::default();
        assert_eq!(Harness::from_config(&config).unwrap().executor().name(), "local");

        config.harness.execution_url = Some("http://127.0.0.1:4000".to_string());
        assert_eq!(Harness::from_config(&config).unwrap().executor().name(), "remote");

        config.harness.execution_url = Some("not a url".to_string());
        assert!(Harness::from_config(&config).is_err());
    }

    #[test]
    fn test_classification_order() {
        let case = || TestCase::new("", "5");

        let compile = classify(
            case(),
            Ok(ExecutionResult {
                build_stderr: "error: expected ';'".to_string(),
                stderr: "ignored".to_string(),
                ..Default::default()
            }),
        );
        assert_eq!(compile.status, TestStatus::CompilationError);
        assert_eq!(compile.actual_output, "error: expected ';'");

        let timeout = classify(
            case(),
            Ok(ExecutionResult {
                stdout: "5".to_string(),
                stderr: "\nError: Time Limit Exceeded (3s)".to_string(),
                ..Default::default()
            }),
        );
        assert_eq!(timeout.status, TestStatus::TimeLimitExceeded);

        let phrase_from_program = classify(
            case(),
            Ok(ExecutionResult {
                stderr: "Time Limit Exceeded on purpose\n".to_string(),
                exit_code: 1,
                ..Default::default()
            }),
        );
        assert_eq!(phrase_from_program.status, TestStatus::RuntimeError);

        let runtime = classify(
            case(),
            Ok(ExecutionResult {
                stdout: "5".to_string(),
                stderr: "Traceback (most recent call last)".to_string(),
                exit_code: 1,
                ..Default::default()
            }),
        );
        assert_eq!(runtime.status, TestStatus::RuntimeError);
        assert!(!runtime.is_correct);

        let accepted = classify(
            case(),
            Ok(ExecutionResult {
                stdout: "  5\n\n".to_string(),
                ..Default::default()
            }),
        );
        assert_eq!(accepted.status, TestStatus::Accepted);
        assert_eq!(accepted.actual_output, "5");
    }

    #[tokio::test]
    async fn test_sum_program_end_to_end_when_available() {
        if which::which("python3").is_err() {
            return;
        }
        let root = tempdir().unwrap();
        let config = SandboxConfig {
            workspace_root: root.path().to_path_buf(),
            ..Default::default()
        };
        let harness = harness_with(Arc::new(Sandbox::new(&config)), InMemoryTestCases::new());
        let source = "a, b = map(int, input().split())\nprint(a + b)\n";
        let cases = vec![TestCase::new("2 3\n", "5"), TestCase::new("10 20\n", "30")];

        let first = harness.verify("python", source, 1, Some(cases.clone())).await;
        assert!(first.success, "{:?}", first);
        assert_eq!(first.passed_count, 2);

        let second = harness.verify("python", source, 1, Some(cases)).await;
        let statuses = |v: &Verification| v.test_case_results.iter().map(|r| r.status).collect::<Vec<_>>();
        assert_eq!(statuses(&first), statuses(&second));
    }
}
