//! A single mirrored pair and its published status.
//!
//! The status fields are the only mutable state in a [`Job`]. They are
//! written by [`Job::ok`] and [`Job::fail`] and read by the status endpoint,
//! both under the same short-lived lock.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use super::models::{JobSpec, JobStatus, StatusDetail};

const REDACTED_FROM: &str = "<REDACTED (FROM)>";
const REDACTED_TO: &str = "<REDACTED (TO)>";

#[derive(Debug)]
pub struct Job {
    id: String,
    from: String,
    to: String,
    status: Mutex<JobStatus>,
}

impl Job {
    pub fn new(spec: JobSpec) -> Self {
        Self {
            id: spec.id,
            from: spec.from,
            to: spec.to,
            status: Mutex::new(JobStatus {
                ok: true,
                time: Utc::now(),
                message: "Pending".to_string(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    /// Directory name of this job's working copy.
    pub fn workdir_name(&self) -> String {
        format!("repo-{}", self.id)
    }

    pub fn status(&self) -> JobStatus {
        self.lock().clone()
    }

    pub fn ok(&self, label: &str, detail: StatusDetail) {
        self.publish(true, label, detail);
    }

    pub fn fail(&self, label: &str, detail: StatusDetail) {
        self.publish(false, label, detail);
    }

    fn publish(&self, ok: bool, label: &str, detail: StatusDetail) {
        {
            let mut status = self.lock();
            status.ok = ok;
            status.message = label.to_string();
            status.time = status.time.max(Utc::now());
        }

        let record = self.log_record(label, &detail);
        if ok {
            info!(job = %self.id, "OK: {}", record);
        } else {
            warn!(job = %self.id, "FAIL: {}", record);
        }
    }

    /// The text logged for a status update, with endpoints redacted.
    pub fn log_record(&self, label: &str, detail: &StatusDetail) -> String {
        self.redact(&detail.render(label))
    }

    /// Replace literal occurrences of the source and destination locators,
    /// which may carry credentials.
    pub fn redact(&self, text: &str) -> String {
        let text = if self.from.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.from, REDACTED_FROM)
        };

        if self.to.is_empty() {
            text
        } else {
            text.replace(&self.to, REDACTED_TO)
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// True when `now` is past `time + stale_after`. A deadline beyond the
/// representable range is never reached.
pub fn is_stale(time: DateTime<Utc>, now: DateTime<Utc>, stale_after: TimeDelta) -> bool {
    match time.checked_add_signed(stale_after) {
        Some(deadline) => now > deadline,
        None => stale_after < TimeDelta::zero(),
    }
}
