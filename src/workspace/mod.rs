//! Per-job scratch directories
//!
//! Every job owns exactly one [`Workspace`]: a freshly created, uniquely
//! named directory holding retrieved media, the report and the archive.
//! The directory is removed by [`Workspace::release`], or by `Drop` when a
//! job exits early, so no exit path leaves it behind.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create scratch root {path}: {source}")]
    ScratchRoot { path: PathBuf, source: io::Error },

    #[error("failed to allocate workspace under {path}: {source}")]
    Allocation { path: PathBuf, source: io::Error },

    #[error("workspace already released")]
    Released,

    #[error("workspace I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Allocates workspaces under one scratch root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    prefix: String,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    /// Manager rooted in the system temp directory
    pub fn in_temp_dir(prefix: impl Into<String>) -> Self {
        Self::new(std::env::temp_dir(), prefix)
    }

    /// Create a fresh, empty, uniquely named directory
    pub async fn allocate(&self) -> Result<Workspace, WorkspaceError> {
        let root = self.root.clone();
        let prefix = self.prefix.clone();

        let dir = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&root).map_err(|source| WorkspaceError::ScratchRoot {
                path: root.clone(),
                source,
            })?;
            tempfile::Builder::new()
                .prefix(&prefix)
                .tempdir_in(&root)
                .map_err(|source| WorkspaceError::Allocation { path: root, source })
        })
        .await
        .map_err(|e| WorkspaceError::Io(io::Error::other(e)))??;

        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "Workspace allocated");

        Ok(Workspace {
            path,
            dir: Some(dir),
        })
    }
}

/// Scratch directory owned by one job
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }

    /// Create (or reuse) a directory inside the workspace
    pub async fn subdir(&self, relative: impl AsRef<Path>) -> Result<PathBuf, WorkspaceError> {
        if self.is_released() {
            return Err(WorkspaceError::Released);
        }
        let path = self.path.join(relative);
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// Recursively delete the directory.
    ///
    /// Idempotent: later calls are no-ops, and a directory that is already
    /// partly or fully gone is not an error.
    pub async fn release(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        let path = self.path.clone();
        let result = tokio::task::spawn_blocking(move || remove_dir(dir)).await;

        match result {
            Ok(Ok(())) => debug!(path = %path.display(), "Workspace released"),
            Ok(Err(e)) => warn!(path = %path.display(), error = %e, "Workspace removal incomplete"),
            Err(e) => warn!(path = %path.display(), error = %e, "Workspace removal task failed"),
        }
    }
}

impl Drop for Workspace {
    /// Removal runs on the blocking pool when a runtime is available, so a
    /// drop inside a task or a body stream never deletes media on a worker
    /// thread
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        debug!(path = %self.path.display(), "Releasing workspace on drop");

        let path = self.path.clone();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || {
                    if let Err(e) = remove_dir(dir) {
                        warn!(path = %path.display(), error = %e, "Workspace removal incomplete");
                    }
                });
            }
            Err(_) => {
                if let Err(e) = remove_dir(dir) {
                    warn!(path = %path.display(), error = %e, "Workspace removal incomplete");
                }
            }
        }
    }
}

fn remove_dir(dir: TempDir) -> io::Result<()> {
    match dir.close() {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
