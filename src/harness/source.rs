//! Test case sources
//!
//! Where stored test cases come from. A problem file holds the test cases
//! and the sample cases of one problem:
//!
//! ```json
//! {
//!   "test_cases": [{ "input": "2 3", "expected_output": "5", "order": 1 }],
//!   "sample_cases": [{ "input": "1 1", "expected_output": "2", "order": 1 }]
//! }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::harness::types::TestCase;

/// Provider of stored test cases, keyed by problem id
#[async_trait]
pub trait TestCaseSource: Send + Sync {
    /// Hidden test cases of a problem, in order
    async fn test_cases(&self, problem_id: i64) -> Result<Vec<TestCase>>;

    /// Sample cases of a problem, in order
    async fn sample_cases(&self, problem_id: i64) -> Result<Vec<TestCase>>;
}

/// Test cases held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryTestCases {
    problems: HashMap<i64, StoredProblem>,
}

#[derive(Debug, Clone, Default)]
struct StoredProblem {
    test_cases: Vec<TestCase>,
    sample_cases: Vec<TestCase>,
}

impl InMemoryTestCases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the test cases of a problem
    pub fn with_test_cases(mut self, problem_id: i64, cases: Vec<TestCase>) -> Self {
        self.problems.entry(problem_id).or_default().test_cases = cases;
        self
    }

    /// Add or replace the sample cases of a problem
    pub fn with_sample_cases(mut self, problem_id: i64, cases: Vec<TestCase>) -> Self {
        self.problems.entry(problem_id).or_default().sample_cases = cases;
        self
    }
}

#[async_trait]
impl TestCaseSource for InMemoryTestCases {
    async fn test_cases(&self, problem_id: i64) -> Result<Vec<TestCase>> {
        Ok(self
            .problems
            .get(&problem_id)
            .map(|p| p.test_cases.clone())
            .unwrap_or_default())
    }

    async fn sample_cases(&self, problem_id: i64) -> Result<Vec<TestCase>> {
        Ok(self
            .problems
            .get(&problem_id)
            .map(|p| p.sample_cases.clone())
            .unwrap_or_default())
    }
}

/// Problem file layout
#[derive(Debug, Default, Deserialize)]
struct ProblemFile {
    #[serde(default)]
    test_cases: Vec<StoredCase>,
    #[serde(default)]
    sample_cases: Vec<StoredCase>,
}

#[derive(Debug, Deserialize)]
struct StoredCase {
    #[serde(default)]
    name: Option<String>,
    input: String,
    expected_output: String,
    #[serde(default)]
    order: Option<i64>,
}

/// Sort stored cases by `order` and give unnamed ones a numbered name
///
/// Ordered cases are numbered by their `order`; the rest keep their file
/// position after them and continue the numbering past the highest order.
fn into_cases(mut stored: Vec<StoredCase>, label: &str) -> Vec<TestCase> {
    stored.sort_by_key(|case| case.order.unwrap_or(i64::MAX));

    let mut next = stored
        .iter()
        .filter_map(|case| case.order)
        .max()
        .unwrap_or(0);

    stored
        .into_iter()
        .map(|case| {
            let number = match case.order {
                Some(order) => order,
                None => {
                    next += 1;
                    next
                }
            };
            TestCase {
                name: Some(
                    case.name
                        .unwrap_or_else(|| format!("{} {}", label, number)),
                ),
                input: case.input,
                expected_output: case.expected_output,
            }
        })
        .collect()
}

/// Test cases read from a directory of `<problem_id>.json` / `.toml` files
#[derive(Debug, Clone)]
pub struct FileTestCases {
    dir: PathBuf,
}

impl FileTestCases {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileTestCases { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and parse the file of one problem; a problem without a file has no cases
    async fn load(&self, problem_id: i64) -> Result<ProblemFile> {
        let json = self.dir.join(format!("{}.json", problem_id));
        if tokio::fs::try_exists(&json).await? {
            let content = tokio::fs::read_to_string(&json).await?;
            debug!("Loaded test cases from {}", json.display());
            return json5::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse {}: {}", json.display(), e))
            });
        }

        let toml_path = self.dir.join(format!("{}.toml", problem_id));
        if tokio::fs::try_exists(&toml_path).await? {
            let content = tokio::fs::read_to_string(&toml_path).await?;
            debug!("Loaded test cases from {}", toml_path.display());
            return toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse {}: {}", toml_path.display(), e))
            });
        }

        debug!("No problem file for {} in {}", problem_id, self.dir.display());
        Ok(ProblemFile::default())
    }
}

#[async_trait]
impl TestCaseSource for FileTestCases {
    async fn test_cases(&self, problem_id: i64) -> Result<Vec<TestCase>> {
        let problem = self.load(problem_id).await?;
        Ok(into_cases(problem.test_cases, "Test Case"))
    }

    async fn sample_cases(&self, problem_id: i64) -> Result<Vec<TestCase>> {
        let problem = self.load(problem_id).await?;
        Ok(into_cases(problem.sample_cases, "Sample Case"))
    }
}

/// Load caller-supplied cases from a standalone file (a JSON/TOML list or a problem file)
pub async fn load_case_file(path: &Path) -> Result<Vec<TestCase>> {
    let content = tokio::fs::read_to_string(path).await?;
    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");

    if is_toml {
        #[derive(Deserialize)]
        struct CaseList {
            #[serde(default, alias = "test_cases")]
            cases: Vec<StoredCase>,
        }
        let list: CaseList = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        return Ok(into_cases(list.cases, "Test Case"));
    }

    let value: serde_json::Value = json5::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    let stored: Vec<StoredCase> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        other => serde_json::from_value::<ProblemFile>(other)?.test_cases,
    };
    Ok(into_cases(stored, "Test Case"))
}
