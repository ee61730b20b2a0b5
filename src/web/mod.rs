//! HTTP health surface for gitmirror.
//!
//! ## Endpoints
//!
//! - `GET /status` - plain-text status of every job; 500 when any job is
//!   failing or stale

mod status;

use axum::{Router, routing::get};
use chrono::TimeDelta;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::core::JobRegistry;

pub use status::{StatusReport, render as render_status, status_handler};

/// Shared state for the web server
#[derive(Clone)]
pub struct WebState {
    pub registry: Arc<JobRegistry>,
    pub stale_after: TimeDelta,
}

impl WebState {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            registry: ctx.registry.clone(),
            stale_after: ctx.config.stale_after(),
        }
    }
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Web server for the status endpoint.
pub struct WebServer {
    bind_addr: SocketAddr,
    state: WebState,
}

impl WebServer {
    pub fn new(ctx: &AppContext, bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            state: WebState::new(ctx),
        }
    }

    /// Serve until `shutdown` is cancelled.
    pub async fn start(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        tracing::info!(addr = %self.bind_addr, "Status endpoint listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        Ok(())
    }
}
