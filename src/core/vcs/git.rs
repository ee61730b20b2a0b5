use crate::core::vcs::{PushRefs, Vcs, VcsError, VcsResult};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Drives the `git` command line client.
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run one git subcommand in `dir` and return stdout followed by stderr.
    ///
    /// The child is killed if `cancel` fires before it exits.
    async fn run<I, S>(
        &self,
        subcommand: &str,
        dir: &Path,
        args: I,
        cancel: &CancellationToken,
    ) -> VcsResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let command = format!("git {}", subcommand);
        debug!(command = %command, dir = %dir.display(), "Running git");

        let child = Command::new(&self.program)
            .arg(subcommand)
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| VcsError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let output = tokio::select! {
            result = child.wait_with_output() => result.map_err(|source| VcsError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?,
            _ = cancel.cancelled() => return Err(VcsError::Cancelled { command }),
        };

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        if output.status.success() {
            Ok(combined)
        } else {
            Err(VcsError::Exit {
                command,
                code: output.status.code(),
                output: combined,
            })
        }
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn clone_repo(
        &self,
        source: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> VcsResult {
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| VcsError::WorkDir {
                path: parent.to_path_buf(),
                source,
            })?;

        let target = dest.file_name().unwrap_or(dest.as_os_str());
        self.run(
            "clone",
            parent,
            [OsStr::new("--"), OsStr::new(source), target],
            cancel,
        )
            .await
    }

    async fn add_remote(
        &self,
        repo: &Path,
        name: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> VcsResult {
        self.run("remote", repo, ["add", name, url], cancel).await
    }

    async fn pull(&self, repo: &Path, cancel: &CancellationToken) -> VcsResult {
        self.run("pull", repo, ["--ff-only"], cancel).await
    }

    async fn push(
        &self,
        repo: &Path,
        remote: &str,
        refs: PushRefs,
        cancel: &CancellationToken,
    ) -> VcsResult {
        let flag = match refs {
            PushRefs::AllBranches => "--all",
            PushRefs::Tags => "--tags",
        };
        self.run("push", repo, [flag, remote], cancel).await
    }

    async fn current_revision(
        &self,
        repo: &Path,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<String, VcsError> {
        let reference = format!("refs/heads/{}", branch);
        let output = self
            .run(
                "rev-parse",
                repo,
                ["--verify", "--quiet", reference.as_str()],
                cancel,
            )
            .await
            .map_err(|e| match e {
                VcsError::Exit { .. } => VcsError::MissingRevision {
                    branch: branch.to_string(),
                },
                other => other,
            })?;

        let revision = String::from_utf8_lossy(&output).trim().to_string();
        if revision.is_empty() {
            return Err(VcsError::MissingRevision {
                branch: branch.to_string(),
            });
        }
        Ok(revision)
    }
}
