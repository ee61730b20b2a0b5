//! Orchestrator wiring: one mirror per registered job.

mod common;

use common::{Call, ScriptedVcs};
use gitmirror::config::AppConfig;
use gitmirror::context::AppContext;
use gitmirror::core::{JobRegistry, JobSpec, Orchestrator};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[tokio::test]
async fn spawns_one_mirror_per_job_and_drains_on_cancel() {
    let work = tempdir().unwrap();
    let config = AppConfig {
        work_root: work.path().to_path_buf(),
        ..AppConfig::default()
    };
    let registry = JobRegistry::new(vec![
        JobSpec::new("a", "repo-x", "repo-y"),
        JobSpec::new("b", "repo-z", "repo-w"),
    ])
    .unwrap();
    let ctx = AppContext::new(config, registry);

    let vcs = Arc::new(ScriptedVcs::with_head("c0ffee"));
    let orchestrator = Orchestrator::new(ctx.clone()).with_vcs(vcs.clone());

    let tracker = TaskTracker::new();
    let cancel = CancellationToken::new();
    orchestrator.spawn_mirrors(&tracker, &cancel);
    tracker.close();

    // Each job clones, adds its remote and completes a first sync.
    tokio::time::timeout(Duration::from_secs(5), async {
        while !ctx
            .registry
            .iter()
            .all(|job| job.status().message == "Synced - pushed")
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("every job synced");

    assert_eq!(vcs.count(|c| matches!(c, Call::Clone { .. })), 2);
    assert_eq!(vcs.count(|c| matches!(c, Call::AddRemote { .. })), 2);
    assert!(work.path().join("repo-a").is_dir());
    assert!(work.path().join("repo-b").is_dir());

    let remotes: Vec<_> = vcs
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::AddRemote { url, .. } => Some(url),
            _ => None,
        })
        .collect();
    assert!(remotes.contains(&"repo-y".to_string()));
    assert!(remotes.contains(&"repo-w".to_string()));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), tracker.wait())
        .await
        .expect("mirrors stop after cancel");
    assert_eq!(vcs.count(|c| matches!(c, Call::Clone { .. })), 2);
}
