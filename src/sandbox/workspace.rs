//! Ephemeral per-execution workspaces
//!
//! A [`Workspace`] owns a uniquely named directory. Dropping it removes the
//! directory, so every exit path (early return, `?`, panic, a cancelled
//! future) cleans up. [`Workspace::release`] does the same asynchronously
//! and is what the normal path calls.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};

const PREFIX: &str = "execution-";

/// An exclusively owned scratch directory
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Create a fresh, collision-free directory under `root`
    pub async fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(format!("{}{}", PREFIX, uuid::Uuid::new_v4().simple()));

        // create_dir (not create_dir_all) fails if the name is somehow taken
        tokio::fs::create_dir(&path).await.map_err(|e| {
            Error::Workspace(format!("Failed to create {}: {}", path.display(), e))
        })?;

        debug!("Acquired workspace {}", path.display());
        Ok(Workspace {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a file relative to the workspace
    pub async fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let target = self.path.join(name);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, contents).await.map_err(|e| {
            Error::Workspace(format!("Failed to write {}: {}", name, e))
        })?;
        Ok(target)
    }

    /// Remove the directory; a directory that is already gone is fine
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!("Released workspace {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove workspace {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed abandoned workspace {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove workspace {}: {}", self.path.display(), e),
        }
    }
}
