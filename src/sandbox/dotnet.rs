//! One-time .NET warm-up
//!
//! Discovering the installed runtime and SDK and listing every reference
//! assembly is slow compared to compiling a small program, so it happens
//! once per process. The resulting `refs-<runtime version>.rsp` lives in a
//! cache directory and is reused by every C# build. The cache outlives the
//! process, so the file name carries the runtime version: a list written for
//! a runtime that has since been replaced is never picked up. If the file
//! disappears it is rebuilt from the already-discovered install; writes go
//! through a temporary file and an atomic rename, so concurrent first use
//! needs no lock.

use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{Error, Result};

const RUNTIME_PACK: &str = "Microsoft.NETCore.App";

/// Installed runtime and compiler, discovered once
#[derive(Debug, Clone)]
struct DotnetInstall {
    runtime_dir: PathBuf,
    runtime_version: Version,
    csc: PathBuf,
}

/// Everything a C# build needs from the warm-up
#[derive(Debug, Clone)]
pub struct DotnetCompiler {
    /// Path to `csc.dll`
    pub csc: PathBuf,
    /// Response file with one `/r:` line per reference assembly
    pub references: PathBuf,
    /// Target framework moniker, e.g. `net8.0`
    pub target_framework: String,
    /// Framework version for `runtimeconfig.json`, e.g. `8.0.0`
    pub framework_version: String,
}

/// Lazily discovered .NET toolchain
pub struct DotnetWarmup {
    root: PathBuf,
    cache_dir: PathBuf,
    install: OnceCell<DotnetInstall>,
}

impl DotnetWarmup {
    pub fn new(root: &Path, cache_dir: &Path) -> Self {
        DotnetWarmup {
            root: root.to_path_buf(),
            cache_dir: cache_dir.to_path_buf(),
            install: OnceCell::new(),
        }
    }

    /// Discover the install (first call only) and make sure the reference
    /// list exists on disk.
    pub async fn prepare(&self) -> Result<DotnetCompiler> {
        let install = self
            .install
            .get_or_try_init(|| discover(&self.root))
            .await?;

        let references = self.references_path(install.runtime_version);
        if !tokio::fs::try_exists(&references).await.unwrap_or(false) {
            write_references(install, &self.cache_dir, &references).await?;
        }

        let Version(major, minor, _) = install.runtime_version;
        Ok(DotnetCompiler {
            csc: install.csc.clone(),
            references,
            target_framework: format!("net{}.{}", major, minor),
            framework_version: format!("{}.{}.0", major, minor),
        })
    }

    fn references_path(&self, runtime: Version) -> PathBuf {
        self.cache_dir.join(format!("refs-{}.rsp", runtime))
    }
}

async fn discover(root: &Path) -> Result<DotnetInstall> {
    debug!("Discovering .NET toolchain under {}", root.display());

    let runtimes = root.join("shared").join(RUNTIME_PACK);
    let (runtime_version, runtime_dir) = newest_version(&runtimes).await?;

    let sdks = root.join("sdk");
    let (_, sdk_dir) = newest_version(&sdks).await?;
    let csc = sdk_dir.join("Roslyn").join("bincore").join("csc.dll");
    if !tokio::fs::try_exists(&csc).await.unwrap_or(false) {
        return Err(Error::Toolchain(format!(
            "C# compiler not found at {}",
            csc.display()
        )));
    }

    info!(
        "Found .NET runtime {} at {}",
        runtime_version,
        runtime_dir.display()
    );

    Ok(DotnetInstall {
        runtime_dir,
        runtime_version,
        csc,
    })
}

async fn write_references(install: &DotnetInstall, cache_dir: &Path, target: &Path) -> Result<()> {
    let mut assemblies = Vec::new();
    let mut entries = tokio::fs::read_dir(&install.runtime_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "dll") {
            assemblies.push(path);
        }
    }

    if assemblies.is_empty() {
        return Err(Error::Toolchain(format!(
            "No reference assemblies in {}",
            install.runtime_dir.display()
        )));
    }
    assemblies.sort();

    let contents = assemblies
        .iter()
        .map(|path| format!("/r:{}", path.display()))
        .collect::<Vec<_>>()
        .join("\n");

    tokio::fs::create_dir_all(cache_dir).await?;
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = cache_dir.join(format!("{}.{}.tmp", file_name, uuid::Uuid::new_v4()));
    tokio::fs::write(&staging, contents).await?;
    if let Err(e) = tokio::fs::rename(&staging, target).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }

    info!(
        "Wrote {} C# references to {}",
        assemblies.len(),
        target.display()
    );
    Ok(())
}

/// Numeric `major.minor.patch`; prerelease suffixes are ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Version(u32, u32, u32);

impl Version {
    fn parse(s: &str) -> Option<Version> {
        let core = s.split('-').next()?;
        let mut parts = core.split('.').map(|p| p.parse::<u32>());
        let major = parts.next()?.ok()?;
        let minor = parts.next().unwrap_or(Ok(0)).ok()?;
        let patch = parts.next().unwrap_or(Ok(0)).ok()?;
        Some(Version(major, minor, patch))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Highest versioned subdirectory of `dir`
async fn newest_version(dir: &Path) -> Result<(Version, PathBuf)> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        Error::Toolchain(format!("Cannot read {}: {}", dir.display(), e))
    })?;

    let mut newest: Option<(Version, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(version) = name.to_str().and_then(Version::parse) else {
            continue;
        };
        if newest.as_ref().map_or(true, |(best, _)| version > *best) {
            newest = Some((version, entry.path()));
        }
    }

    newest.ok_or_else(|| Error::Toolchain(format!("No versions installed in {}", dir.display())))
}
