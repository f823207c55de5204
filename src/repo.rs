// src/repo.rs

//! Repository references and the refresh collaborator.
//!
//! The engine only reads a repository's path (for `git -C` and for the
//! directory-exists precondition) and asks for a refresh once a group is
//! done with it. Everything else about a repository lives outside the core.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::Result;

/// A repository targeted by one or more task groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    name: String,
    fullpath: PathBuf,
}

/// Shared handle: every task of a group, and every group targeting the
/// same repository, points at the same `RepoInfo`.
pub type RepoRef = Arc<RepoInfo>;

impl RepoInfo {
    pub fn new(name: impl Into<String>, fullpath: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            fullpath: fullpath.into(),
        }
    }

    /// Convenience constructor returning a shared reference.
    pub fn shared(name: impl Into<String>, fullpath: impl Into<PathBuf>) -> RepoRef {
        Arc::new(Self::new(name, fullpath))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fullpath(&self) -> &Path {
        &self.fullpath
    }
}

impl fmt::Display for RepoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Re-reads repository metadata after the engine changed it.
///
/// Refreshes are fire-and-forget from the engine's point of view: the
/// returned future is spawned by the runtime and only its error is logged.
pub trait RepoRefresher: Send + Sync {
    fn refresh(&self, repo: RepoRef) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;
}

/// Refresher that does nothing. Default for embedders that track repository
/// state themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRefresher;

impl RepoRefresher for NoopRefresher {
    fn refresh(&self, repo: RepoRef) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>> {
        Box::pin(async move {
            debug!(repo = %repo, "refresh skipped (noop refresher)");
            Ok(())
        })
    }
}

/// Refresher that asks git for the current branch and logs it.
#[derive(Debug, Clone)]
pub struct GitRefresher {
    git: PathBuf,
}

impl GitRefresher {
    pub fn new(git: impl Into<PathBuf>) -> Self {
        Self { git: git.into() }
    }
}

impl RepoRefresher for GitRefresher {
    fn refresh(&self, repo: RepoRef) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>> {
        let git = self.git.clone();

        Box::pin(async move {
            if !tokio::fs::metadata(repo.fullpath())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false)
            {
                debug!(repo = %repo, path = ?repo.fullpath(), "repository directory missing; nothing to refresh");
                return Ok(());
            }

            let output = Command::new(&git)
                .arg("-C")
                .arg(repo.fullpath())
                .args(["rev-parse", "--abbrev-ref", "HEAD"])
                .stdin(Stdio::null())
                .output()
                .await
                .with_context(|| format!("refreshing repository '{}'", repo.name()))?;

            if output.status.success() {
                let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
                info!(repo = %repo, %branch, "repository refreshed");
            } else {
                warn!(
                    repo = %repo,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "could not read current branch"
                );
            }

            Ok(())
        })
    }
}
