//! Client for a running daemon's status endpoint.

use anyhow::{Context, Result};

pub const DEFAULT_STATUS_URL: &str = "http://127.0.0.1:8080/status";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub code: u16,
    pub body: String,
}

impl StatusResponse {
    pub fn healthy(&self) -> bool {
        self.code == 200
    }
}

pub struct StatusClient {
    url: String,
    client: reqwest::Client,
}

impl StatusClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the status page. A 500 is a valid (unhealthy) answer, not an error.
    pub async fn fetch(&self) -> Result<StatusResponse> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to reach daemon at {}", self.url))?;

        let code = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Failed to read status body")?;

        Ok(StatusResponse { code, body })
    }
}
