use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::context::AppContext;
use crate::core::mirror::Mirror;
use crate::core::vcs::{self, Vcs};
use crate::web::WebServer;

/// Starts one mirror loop per job plus the status endpoint.
pub struct Orchestrator {
    ctx: AppContext,
    vcs: Arc<dyn Vcs>,
}

impl Orchestrator {
    pub fn new(ctx: AppContext) -> Self {
        let vcs = vcs::create_vcs(&ctx.config.git_binary);
        Self { ctx, vcs }
    }

    pub fn with_vcs(mut self, vcs: Arc<dyn Vcs>) -> Self {
        self.vcs = vcs;
        self
    }

    /// Spawn a mirror for every registered job onto `tracker`.
    pub fn spawn_mirrors(&self, tracker: &TaskTracker, cancel: &CancellationToken) {
        let settings = self.ctx.config.mirror_settings();

        for job in self.ctx.registry.iter() {
            let mirror = Mirror::new(job.clone(), self.vcs.clone(), settings.clone());
            tracker.spawn(mirror.run(cancel.child_token()));
        }
    }

    /// Run until SIGINT/SIGTERM, then stop every mirror and the server.
    pub async fn start(&self) -> Result<()> {
        info!(
            jobs = self.ctx.registry.len(),
            work_root = %self.ctx.config.work_root.display(),
            "gitmirror starting"
        );

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                shutdown_signal().await;
                info!("Shutdown requested");
                cancel.cancel();
            }
        });

        let tracker = TaskTracker::new();
        self.spawn_mirrors(&tracker, &cancel);
        tracker.close();

        let server = WebServer::new(&self.ctx, self.ctx.config.bind_addr);
        let served = server.start(cancel.clone()).await;

        cancel.cancel();
        tracker.wait().await;
        served
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
