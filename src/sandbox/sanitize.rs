//! Output sanitizer
//!
//! Scrubs host-identifying substrings (the temporary/workspace root and the
//! account the service runs as) from everything that leaves the sandbox.

use std::path::Path;

use crate::sandbox::executor::ExecutionResult;

/// Placeholder for the temporary directory root
pub const PATH_PLACEHOLDER: &str = "/sandbox";

/// Placeholder for the host account name
pub const USER_PLACEHOLDER: &str = "user";

/// Substring replacer built once per service
#[derive(Debug, Clone)]
pub struct Sanitizer {
    roots: Vec<String>,
    account: Option<String>,
}

impl Sanitizer {
    /// Sanitizer for the system temp dir, `workspace_root` and the current account
    pub fn new(workspace_root: &Path) -> Self {
        Sanitizer::with_account(workspace_root, current_account())
    }

    /// Sanitizer with an explicit (or absent) account name
    pub fn with_account(workspace_root: &Path, account: Option<String>) -> Self {
        let mut roots = Vec::new();
        for root in [workspace_root.to_path_buf(), std::env::temp_dir()] {
            let text = root.to_string_lossy();
            let text = text.trim_end_matches('/');
            if !text.is_empty() && !roots.iter().any(|r: &String| r == text) {
                roots.push(text.to_string());
            }
        }
        // longest first so a nested root is not half-replaced by its parent
        roots.sort_by(|a, b| b.len().cmp(&a.len()));

        Sanitizer {
            roots,
            account: account.filter(|name| !name.is_empty()),
        }
    }

    /// Replace every temp-root and account-name occurrence
    pub fn sanitize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut sanitized = text.to_string();
        for root in &self.roots {
            sanitized = sanitized.replace(root.as_str(), PATH_PLACEHOLDER);
        }
        if let Some(account) = &self.account {
            sanitized = sanitized.replace(account.as_str(), USER_PLACEHOLDER);
        }
        sanitized
    }

    /// Sanitize every text field of a result
    pub fn sanitize_result(&self, result: ExecutionResult) -> ExecutionResult {
        ExecutionResult {
            build_stdout: self.sanitize(&result.build_stdout),
            build_stderr: self.sanitize(&result.build_stderr),
            stdout: self.sanitize(&result.stdout),
            stderr: self.sanitize(&result.stderr),
            exit_code: result.exit_code,
        }
    }
}

/// Best-effort lookup of the account name; `None` when it cannot be determined
fn current_account() -> Option<String> {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .or_else(|| {
            dirs::home_dir()
                .and_then(|home| home.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_scrubs_temp_root_and_account() {
        let temp = std::env::temp_dir();
        let sanitizer = Sanitizer::with_account(&temp, Some("alice".to_string()));

        let raw = format!(
            "{}/execution-1234/main.c:3: error (home /home/alice)",
            temp.to_string_lossy().trim_end_matches('/')
        );
        let clean = sanitizer.sanitize(&raw);

        assert_eq!(clean, "/sandbox/execution-1234/main.c:3: error (home /home/user)");
        assert!(!clean.contains("alice"));
    }

    #[test]
    fn test_custom_workspace_root() {
        let root = PathBuf::from("/srv/judge/work/");
        let sanitizer = Sanitizer::with_account(&root, None);
        assert_eq!(
            sanitizer.sanitize("/srv/judge/work/execution-1/Main.java"),
            "/sandbox/execution-1/Main.java"
        );
    }

    #[test]
    fn test_missing_account_is_skipped() {
        let sanitizer = Sanitizer::with_account(Path::new("/tmp"), None);
        assert_eq!(sanitizer.sanitize("hello alice"), "hello alice");

        let sanitizer = Sanitizer::with_account(Path::new("/tmp"), Some(String::new()));
        assert_eq!(sanitizer.sanitize("hello"), "hello");
    }

    #[test]
    fn test_sanitize_result_keeps_exit_code() {
        let sanitizer = Sanitizer::with_account(Path::new("/tmp"), Some("bob".to_string()));
        let result = ExecutionResult {
            build_stderr: "/tmp/x: bob".to_string(),
            stdout: "bob".to_string(),
            exit_code: 7,
            ..Default::default()
        };

        let clean = sanitizer.sanitize_result(result);
        assert!(!clean.build_stderr.contains("bob"));
        assert!(clean.build_stderr.starts_with("/sandbox"));
        assert_eq!(clean.stdout, "user");
        assert_eq!(clean.exit_code, 7);
    }

    #[test]
    fn test_current_account_lookup_does_not_panic() {
        let sanitizer = Sanitizer::new(&std::env::temp_dir());
        assert_eq!(sanitizer.sanitize(""), "");
    }
}
