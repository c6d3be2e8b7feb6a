//! Configuration paths
//!
//! Every judgebox directory resolves the same way: a `JUDGEBOX_*`
//! environment override, then the platform directory from `dirs`, then a
//! fallback under the home or temp directory.

use std::ffi::OsString;
use std::path::PathBuf;

const APP_DIR: &str = "judgebox";

/// Pick the override if set and non-empty, else `<base>/judgebox`, else the fallback
fn resolve(
    override_value: Option<OsString>,
    base: Option<PathBuf>,
    fallback: impl FnOnce() -> PathBuf,
) -> PathBuf {
    match override_value.filter(|value| !value.is_empty()) {
        Some(value) => PathBuf::from(value),
        None => base.map(|b| b.join(APP_DIR)).unwrap_or_else(fallback),
    }
}

/// `~/<parts...>/judgebox`, or `./.judgebox` without a home directory
fn home_fallback(parts: &[&str]) -> PathBuf {
    match dirs::home_dir() {
        Some(home) => parts.iter().fold(home, |dir, part| dir.join(part)).join(APP_DIR),
        None => PathBuf::from(".judgebox"),
    }
}

/// Configuration directory
pub fn config_dir() -> PathBuf {
    resolve(
        std::env::var_os("JUDGEBOX_CONFIG_DIR"),
        dirs::config_dir(),
        || home_fallback(&[".config"]),
    )
}

/// Main configuration file
pub fn config_path() -> PathBuf {
    resolve(std::env::var_os("JUDGEBOX_CONFIG"), None, || {
        config_dir().join("config.json")
    })
}

/// State directory
pub fn state_dir() -> PathBuf {
    resolve(
        std::env::var_os("JUDGEBOX_STATE_DIR"),
        dirs::data_dir(),
        || home_fallback(&[".local", "share"]),
    )
}

/// Stored problem files (`<problem_id>.json` / `.toml`)
pub fn problems_dir() -> PathBuf {
    resolve(std::env::var_os("JUDGEBOX_PROBLEMS_DIR"), None, || {
        state_dir().join("problems")
    })
}

/// Cache directory (toolchain warm-up artifacts)
pub fn cache_dir() -> PathBuf {
    resolve(
        std::env::var_os("JUDGEBOX_CACHE_DIR"),
        dirs::cache_dir(),
        || std::env::temp_dir().join("judgebox-cache"),
    )
}
