//! Shared fakes for driving a mirror without touching git.

#![allow(dead_code)]

use async_trait::async_trait;
use gitmirror::core::{PushRefs, SyncLimiter, Timer, Vcs, VcsError, VcsResult};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub fn exit(code: i32, output: &str) -> VcsError {
    VcsError::Exit {
        command: "git".to_string(),
        code: Some(code),
        output: output.as_bytes().to_vec(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Clone { dest_existed: bool },
    AddRemote { name: String, url: String },
    Pull,
    Push(PushRefs),
    Revision { branch: String },
}

/// A [`Vcs`] that replays queued results and records every call.
///
/// Empty queues succeed with no output; `head` is the revision reported once
/// the revision queue runs dry.
#[derive(Default)]
pub struct ScriptedVcs {
    pub clones: Mutex<VecDeque<VcsResult>>,
    pub remotes: Mutex<VecDeque<VcsResult>>,
    pub pulls: Mutex<VecDeque<VcsResult>>,
    pub branch_pushes: Mutex<VecDeque<VcsResult>>,
    pub tag_pushes: Mutex<VecDeque<VcsResult>>,
    pub revisions: Mutex<VecDeque<Result<String, VcsError>>>,
    pub head: Mutex<String>,
    pub hang_on_remote: bool,
    pub calls: Mutex<Vec<Call>>,
    pub clone_times: Mutex<Vec<Instant>>,
}

impl ScriptedVcs {
    pub fn with_head(head: &str) -> Self {
        Self {
            head: Mutex::new(head.to_string()),
            ..Self::default()
        }
    }

    pub fn set_head(&self, head: &str) {
        *self.head.lock().unwrap() = head.to_string();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next(queue: &Mutex<VecDeque<VcsResult>>) -> VcsResult {
        queue.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl Vcs for ScriptedVcs {
    async fn clone_repo(
        &self,
        _source: &str,
        dest: &Path,
        _cancel: &CancellationToken,
    ) -> VcsResult {
        self.record(Call::Clone {
            dest_existed: dest.exists(),
        });
        self.clone_times.lock().unwrap().push(Instant::now());

        // Leave a partial checkout behind, as a real failed clone can.
        std::fs::create_dir_all(dest).map_err(|source| VcsError::WorkDir {
            path: dest.to_path_buf(),
            source,
        })?;

        Self::next(&self.clones)
    }

    async fn add_remote(
        &self,
        _repo: &Path,
        name: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> VcsResult {
        self.record(Call::AddRemote {
            name: name.to_string(),
            url: url.to_string(),
        });

        if self.hang_on_remote {
            cancel.cancelled().await;
            return Err(VcsError::Cancelled {
                command: "git remote".to_string(),
            });
        }

        Self::next(&self.remotes)
    }

    async fn pull(&self, _repo: &Path, _cancel: &CancellationToken) -> VcsResult {
        self.record(Call::Pull);
        Self::next(&self.pulls)
    }

    async fn push(
        &self,
        _repo: &Path,
        _remote: &str,
        refs: PushRefs,
        _cancel: &CancellationToken,
    ) -> VcsResult {
        self.record(Call::Push(refs));
        match refs {
            PushRefs::AllBranches => Self::next(&self.branch_pushes),
            PushRefs::Tags => Self::next(&self.tag_pushes),
        }
    }

    async fn current_revision(
        &self,
        _repo: &Path,
        branch: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, VcsError> {
        self.record(Call::Revision {
            branch: branch.to_string(),
        });
        match self.revisions.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(self.head.lock().unwrap().clone()),
        }
    }
}

/// Records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingTimer {
    pub delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Timer for RecordingTimer {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Admits one sync iteration per message received.
pub struct ManualLimiter {
    ticks: mpsc::UnboundedReceiver<()>,
}

impl ManualLimiter {
    pub fn new() -> (Self, mpsc::UnboundedSender<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { ticks: rx }, tx)
    }
}

#[async_trait]
impl SyncLimiter for ManualLimiter {
    async fn until_ready(&mut self) {
        if self.ticks.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}
