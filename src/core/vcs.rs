//! Version-control executor.
//!
//! The mirror loop never shells out directly; it drives a [`Vcs`]
//! implementation. Production uses [`git::GitCli`], tests substitute fakes.

pub mod git;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use git::GitCli;

/// Combined stdout/stderr of a successful invocation.
pub type VcsResult = Result<Vec<u8>, VcsError>;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare {}: {source}", .path.display())]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {}", describe_exit(.code))]
    Exit {
        command: String,
        code: Option<i32>,
        output: Vec<u8>,
    },

    #[error("{command} was cancelled")]
    Cancelled { command: String },

    #[error("no revision found for branch '{branch}'")]
    MissingRevision { branch: String },
}

impl VcsError {
    /// Output captured from the failed command, if it got far enough to produce any.
    pub fn output(&self) -> Option<&[u8]> {
        match self {
            VcsError::Exit { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, VcsError::Cancelled { .. })
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Which refs a push sends to the destination remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushRefs {
    AllBranches,
    Tags,
}

#[async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `source` into `dest`. `dest` must not exist yet.
    async fn clone_repo(&self, source: &str, dest: &Path, cancel: &CancellationToken)
    -> VcsResult;

    /// Register `url` as remote `name` on the repository at `repo`.
    async fn add_remote(
        &self,
        repo: &Path,
        name: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> VcsResult;

    /// Pull from the repository's origin.
    async fn pull(&self, repo: &Path, cancel: &CancellationToken) -> VcsResult;

    async fn push(
        &self,
        repo: &Path,
        remote: &str,
        refs: PushRefs,
        cancel: &CancellationToken,
    ) -> VcsResult;

    /// Commit id the local `branch` currently points at.
    async fn current_revision(
        &self,
        repo: &Path,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<String, VcsError>;
}

/// Factory for the production executor.
pub fn create_vcs(program: impl Into<PathBuf>) -> Arc<dyn Vcs> {
    Arc::new(GitCli::new(program))
}
