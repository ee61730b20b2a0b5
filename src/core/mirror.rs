//! The per-job mirror loop.
//!
//! A [`Mirror`] drives one [`Job`] through three phases:
//!
//! 1. **Cloning**: clone the source into the job's working directory,
//!    wiping the directory and retrying after a fixed delay on failure.
//! 2. **RemoteSetup**: register the destination as an extra remote,
//!    retrying after a shorter delay on failure.
//! 3. **Syncing**: forever, once per limiter tick, pull from the source and
//!    push branches and tags to the destination when the default branch
//!    moved.
//!
//! Every failure is published on the job's status and retried; nothing in
//! here gives up.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use super::job::Job;
use super::models::StatusDetail;
use super::pacing::{Cancelled, RetryPolicy, SyncLimiter, Timer, TokenBucket, TokioTimer};
use super::vcs::{PushRefs, Vcs, VcsError};

pub const CLONE_RETRY_DELAY: Duration = Duration::from_secs(10);
pub const REMOTE_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const SYNC_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct MirrorSettings {
    /// Directory holding every job's `repo-<id>` working copy.
    pub work_root: PathBuf,
    /// Branch whose head decides whether anything needs pushing.
    pub default_branch: String,
    /// Name of the remote pointing at the destination.
    pub remote_name: String,
    pub clone_retry: RetryPolicy,
    pub remote_retry: RetryPolicy,
    pub sync_interval: Duration,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            work_root: PathBuf::from("."),
            default_branch: "master".to_string(),
            remote_name: "to".to_string(),
            clone_retry: RetryPolicy::fixed(CLONE_RETRY_DELAY),
            remote_retry: RetryPolicy::fixed(REMOTE_RETRY_DELAY),
            sync_interval: SYNC_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorPhase {
    Cloning,
    RemoteSetup,
    Syncing,
}

/// The step of a sync iteration that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Pull,
    ReadHead,
    PushBranches,
    PushTags,
}

impl SyncStep {
    pub fn label(self) -> &'static str {
        match self {
            SyncStep::Pull => "Pull",
            SyncStep::ReadHead => "Parse HEAD",
            SyncStep::PushBranches => "Push",
            SyncStep::PushTags => "Push tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    NothingToPush,
    Pushed { revision: String },
    Failed(SyncStep),
    Cancelled,
}

pub struct Mirror {
    job: Arc<Job>,
    vcs: Arc<dyn Vcs>,
    timer: Arc<dyn Timer>,
    limiter: Box<dyn SyncLimiter>,
    settings: MirrorSettings,
    workdir: PathBuf,
    phase: MirrorPhase,
    baseline: Option<String>,
}

impl Mirror {
    pub fn new(job: Arc<Job>, vcs: Arc<dyn Vcs>, settings: MirrorSettings) -> Self {
        let workdir = settings.work_root.join(job.workdir_name());
        let limiter = Box::new(TokenBucket::every(settings.sync_interval));

        Self {
            job,
            vcs,
            timer: Arc::new(TokioTimer),
            limiter,
            settings,
            workdir,
            phase: MirrorPhase::Cloning,
            baseline: None,
        }
    }

    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_limiter(mut self, limiter: Box<dyn SyncLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn job(&self) -> &Arc<Job> {
        &self.job
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn phase(&self) -> MirrorPhase {
        self.phase
    }

    /// Revision of the default branch as of the last fully pushed sync.
    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    /// Run the full lifecycle until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let span = info_span!("mirror", job = %self.job.id());

        async move {
            if self.clone_until_ready(&cancel).await.is_err() {
                return;
            }
            if self.add_remote_until_ready(&cancel).await.is_err() {
                return;
            }

            loop {
                tokio::select! {
                    _ = self.limiter.until_ready() => {}
                    _ = cancel.cancelled() => break,
                }

                if self.sync_once(&cancel).await == SyncOutcome::Cancelled {
                    break;
                }
            }

            debug!("Mirror loop stopped");
        }
        .instrument(span)
        .await
    }

    /// Clone until an attempt succeeds. Returns the number of attempts made.
    pub async fn clone_until_ready(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<u32, Cancelled> {
        self.phase = MirrorPhase::Cloning;
        self.job.ok("Cloning", StatusDetail::none());

        let mut attempts = 0;
        loop {
            attempts += 1;

            match self
                .vcs
                .clone_repo(self.job.from(), &self.workdir, cancel)
                .await
            {
                Ok(output) => {
                    self.job.ok("Cloned", StatusDetail::output(output));
                    self.phase = MirrorPhase::RemoteSetup;
                    return Ok(attempts);
                }
                Err(e) if e.is_cancelled() => return Err(Cancelled),
                Err(e) => {
                    self.job.fail("Cloning", StatusDetail::from_vcs(&e));
                    self.remove_workdir().await;
                    self.settings.clone_retry.wait(&*self.timer, cancel).await?;
                }
            }
        }
    }

    /// Add the destination remote until an attempt succeeds.
    pub async fn add_remote_until_ready(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<u32, Cancelled> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            debug!(remote = %self.settings.remote_name, "Setting remote");

            match self
                .vcs
                .add_remote(
                    &self.workdir,
                    &self.settings.remote_name,
                    self.job.to(),
                    cancel,
                )
                .await
            {
                Ok(output) => {
                    self.job.ok("Added remote", StatusDetail::output(output));
                    self.phase = MirrorPhase::Syncing;
                    return Ok(attempts);
                }
                Err(e) if e.is_cancelled() => return Err(Cancelled),
                Err(e) => {
                    self.job.fail("Adding remote", StatusDetail::from_vcs(&e));
                    self.settings.remote_retry.wait(&*self.timer, cancel).await?;
                }
            }
        }
    }

    /// One pull, compare, push iteration. The baseline only advances once
    /// both pushes succeed, so a failed push is retried on the next tick.
    pub async fn sync_once(&mut self, cancel: &CancellationToken) -> SyncOutcome {
        debug!("Pulling");
        let pulled = match self.vcs.pull(&self.workdir, cancel).await {
            Ok(output) => output,
            Err(e) => return self.step_failed(SyncStep::Pull, &e),
        };
        debug!(output = %self.job.redact(&String::from_utf8_lossy(&pulled)), "Pulled");

        let revision = match self
            .vcs
            .current_revision(&self.workdir, &self.settings.default_branch, cancel)
            .await
        {
            Ok(revision) => revision,
            Err(e) => return self.step_failed(SyncStep::ReadHead, &e),
        };

        if self.baseline.as_deref() == Some(revision.as_str()) {
            self.job.ok(
                "Synced - nothing to push",
                StatusDetail::message(format!("at {}", revision)),
            );
            return SyncOutcome::NothingToPush;
        }

        debug!(revision = %revision, "Pushing");
        if let Err(e) = self
            .vcs
            .push(
                &self.workdir,
                &self.settings.remote_name,
                PushRefs::AllBranches,
                cancel,
            )
            .await
        {
            return self.step_failed(SyncStep::PushBranches, &e);
        }

        debug!("Pushing tags");
        let output = match self
            .vcs
            .push(
                &self.workdir,
                &self.settings.remote_name,
                PushRefs::Tags,
                cancel,
            )
            .await
        {
            Ok(output) => output,
            Err(e) => return self.step_failed(SyncStep::PushTags, &e),
        };

        self.job.ok("Synced - pushed", StatusDetail::output(output));
        self.baseline = Some(revision.clone());
        SyncOutcome::Pushed { revision }
    }

    fn step_failed(&self, step: SyncStep, error: &VcsError) -> SyncOutcome {
        if error.is_cancelled() {
            return SyncOutcome::Cancelled;
        }
        self.job.fail(step.label(), StatusDetail::from_vcs(error));
        SyncOutcome::Failed(step)
    }

    async fn remove_workdir(&self) {
        match tokio::fs::remove_dir_all(&self.workdir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                dir = %self.workdir.display(),
                error = %e,
                "Failed to remove partial clone"
            ),
        }
    }
}
