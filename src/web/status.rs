//! Plain-text health report over every job.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use std::fmt::Write;
use std::sync::Arc;

use super::WebState;
use crate::core::Job;
use crate::core::job::is_stale;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub healthy: bool,
    pub body: String,
}

impl StatusReport {
    pub fn status_code(&self) -> StatusCode {
        if self.healthy {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Render the report as of `now`. A job that failed, or has not updated its
/// status within `stale_after`, makes the whole report unhealthy.
pub fn render(jobs: &[Arc<Job>], now: DateTime<Utc>, stale_after: TimeDelta) -> StatusReport {
    let snapshots: Vec<_> = jobs.iter().map(|job| (job.id(), job.status())).collect();

    let mut healthy = true;
    let mut body = String::new();

    for (id, status) in &snapshots {
        if !status.ok {
            healthy = false;
        }
        if is_stale(status.time, now, stale_after) {
            healthy = false;
            let _ = writeln!(body, "Repo {:?} possibly not fresh", id);
        }
    }

    for (id, status) in &snapshots {
        let _ = writeln!(body, "---- repo {} ----", id);
        let _ = writeln!(body, "OK {}", status.ok);
        let _ = writeln!(
            body,
            "{}",
            status.time.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        let _ = writeln!(body, "{}", status.message);
    }

    StatusReport { healthy, body }
}

pub async fn status_handler(State(state): State<WebState>) -> impl IntoResponse {
    let report = render(state.registry.jobs(), Utc::now(), state.stale_after);

    (
        report.status_code(),
        [(header::CONTENT_TYPE, "text/plain")],
        report.body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{JobSpec, StatusDetail};

    fn jobs() -> Vec<Arc<Job>> {
        vec![
            Arc::new(Job::new(JobSpec::new("a", "repo-x", "repo-y"))),
            Arc::new(Job::new(JobSpec::new("b", "repo-z", "repo-w"))),
        ]
    }

    #[test]
    fn healthy_when_all_ok_and_fresh() {
        let jobs = jobs();
        let report = render(&jobs, Utc::now(), TimeDelta::minutes(15));

        assert!(report.healthy);
        assert_eq!(report.status_code(), StatusCode::OK);
        assert!(report.body.starts_with("---- repo a ----\nOK true\n"));
        assert!(report.body.contains("---- repo b ----\nOK true\n"));
    }

    #[test]
    fn one_failed_job_fails_report_but_lists_all() {
        let jobs = jobs();
        jobs[0].fail("Cloning", StatusDetail::none());

        let report = render(&jobs, Utc::now(), TimeDelta::minutes(15));

        assert!(!report.healthy);
        assert_eq!(report.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(report.body.contains("---- repo a ----\nOK false\n"));
        assert!(report.body.contains("\nCloning\n"));
        assert!(report.body.contains("---- repo b ----\nOK true\n"));
    }

    #[test]
    fn stale_jobs_are_flagged_first() {
        let jobs = jobs();
        let later = Utc::now() + TimeDelta::minutes(16);

        let report = render(&jobs, later, TimeDelta::minutes(15));

        assert!(!report.healthy);
        assert!(report.body.starts_with(
            "Repo \"a\" possibly not fresh\nRepo \"b\" possibly not fresh\n---- repo a ----"
        ));
    }

    #[test]
    fn message_is_label_only() {
        let jobs = jobs();
        jobs[1].fail(
            "Push",
            StatusDetail {
                error: Some("git push failed: exit status 1".to_string()),
                output: Some(b"remote rejected repo-w".to_vec()),
            },
        );

        let report = render(&jobs, Utc::now(), TimeDelta::minutes(15));

        assert!(report.body.ends_with("\nPush\n"));
        assert!(!report.body.contains("remote rejected"));
        assert!(!report.body.contains("exit status"));
    }
}
