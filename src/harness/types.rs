//! Test harness types

use serde::{Deserialize, Serialize};

/// One named input/expected-output pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub name: Option<String>,
    pub input: String,
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        TestCase {
            name: None,
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name shown in results
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Test Case")
    }

    /// Input as fed to the program: always newline-terminated
    pub fn normalized_input(&self) -> String {
        if self.input.ends_with('\n') {
            self.input.clone()
        } else {
            format!("{}\n", self.input)
        }
    }
}

/// Verdict for a single test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Wrong Answer")]
    WrongAnswer,
    #[serde(rename = "Runtime Error")]
    RuntimeError,
    #[serde(rename = "Time Limit Exceeded")]
    TimeLimitExceeded,
    #[serde(rename = "Compilation Error")]
    CompilationError,
    #[serde(rename = "System Error")]
    SystemError,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Accepted => "Accepted",
            TestStatus::WrongAnswer => "Wrong Answer",
            TestStatus::RuntimeError => "Runtime Error",
            TestStatus::TimeLimitExceeded => "Time Limit Exceeded",
            TestStatus::CompilationError => "Compilation Error",
            TestStatus::SystemError => "System Error",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, TestStatus::Accepted)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub name: String,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub is_correct: bool,
    pub status: TestStatus,
}

/// Aggregate verdict for a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub success: bool,
    pub message: String,
    pub test_case_results: Vec<TestCaseResult>,
    pub passed_count: usize,
    pub total_count: usize,
}

impl Verification {
    pub(crate) const ALL_PASSED: &'static str = "All test cases passed.";
    pub(crate) const NO_TEST_CASES: &'static str = "No test cases found.";
    pub(crate) const INTERNAL_ERROR: &'static str =
        "An internal error occurred while running the submission.";

    /// Aggregate per-case results; success means every case was accepted
    pub fn from_results(results: Vec<TestCaseResult>) -> Self {
        let total_count = results.len();
        let passed_count = results.iter().filter(|r| r.is_correct).count();
        let success = results.iter().all(|r| r.is_correct);

        let message = if success {
            Self::ALL_PASSED.to_string()
        } else {
            format!(
                "Some test cases failed. ({}/{} passed)",
                passed_count, total_count
            )
        };

        Verification {
            success,
            message,
            test_case_results: results,
            passed_count,
            total_count,
        }
    }

    /// A failed verification with no per-case results
    pub fn failed(message: impl Into<String>) -> Self {
        Verification {
            success: false,
            message: message.into(),
            test_case_results: Vec::new(),
            passed_count: 0,
            total_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: TestStatus) -> TestCaseResult {
        TestCaseResult {
            name: "Test Case".to_string(),
            input: String::new(),
            expected_output: String::new(),
            actual_output: String::new(),
            is_correct: status.is_accepted(),
            status,
        }
    }

    #[test]
    fn test_normalized_input() {
        assert_eq!(TestCase::new("2 3", "5").normalized_input(), "2 3\n");
        assert_eq!(TestCase::new("2 3\n", "5").normalized_input(), "2 3\n");
        assert_eq!(TestCase::new("", "").normalized_input(), "\n");
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&TestStatus::WrongAnswer).unwrap();
        assert_eq!(json, "\"Wrong Answer\"");
        let parsed: TestStatus = serde_json::from_str("\"Time Limit Exceeded\"").unwrap();
        assert_eq!(parsed, TestStatus::TimeLimitExceeded);
    }

    #[test]
    fn test_aggregate_messages() {
        let all = Verification::from_results(vec![
            result(TestStatus::Accepted),
            result(TestStatus::Accepted),
        ]);
        assert!(all.success);
        assert_eq!(all.message, Verification::ALL_PASSED);
        assert_eq!(all.passed_count, 2);

        let some = Verification::from_results(vec![
            result(TestStatus::Accepted),
            result(TestStatus::WrongAnswer),
        ]);
        assert!(!some.success);
        assert_eq!(some.message, "Some test cases failed. (1/2 passed)");
        assert_eq!(some.total_count, 2);
    }

    #[test]
    fn test_result_wire_format() {
        let value = serde_json::to_value(result(TestStatus::Accepted)).unwrap();
        assert_eq!(value["is_correct"], true);
        assert_eq!(value["expected_output"], "");
        assert_eq!(value["status"], "Accepted");
    }

    #[test]
    fn test_case_accepts_missing_name() {
        let case: TestCase =
            serde_json::from_str(r#"{ "input": "1\n", "expected_output": "1" }"#).unwrap();
        assert_eq!(case.display_name(), "Test Case");
    }
}
