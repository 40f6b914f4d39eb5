//! Access to the preview service from the client side.
//!
//! The monitor never talks to a preview container directly; everything goes
//! through the service, including probes, which the server performs on the
//! client's behalf to sidestep cross-origin and private-network limits.

use std::time::Duration;

use async_trait::async_trait;
use glimpse_core::WorkspaceKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Result type alias for endpoint operations.
pub type EndpointResult<T> = Result<T, EndpointError>;

/// Errors from talking to the preview service.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The workspace does not exist or is not a usable repository.
    #[error("Workspace not found")]
    WorkspaceNotFound,

    /// The service reported a failure (e.g. the container would not start).
    #[error("Preview service error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Preview status as reported by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub is_responding: bool,
    pub preview_url: Option<String>,
}

/// Result of an explicit start request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartOutcome {
    pub success: bool,
    pub url: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

/// Result of a server-side probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub status: Option<u16>,
}

/// The three service operations the monitor needs.
#[async_trait]
pub trait PreviewEndpoint: Send + Sync {
    /// Read the current status of the workspace's preview.
    async fn fetch_status(&self, key: &WorkspaceKey) -> EndpointResult<StatusSnapshot>;

    /// Start (or reuse) the preview instance.
    async fn start(&self, key: &WorkspaceKey) -> EndpointResult<StartOutcome>;

    /// Probe an address through the server. Infallible: transport problems
    /// collapse to `ok: false`, matching the server's own contract.
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}

/// HTTP implementation against a running Glimpse service.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn status_url(&self, key: &WorkspaceKey) -> String {
        match &key.session_id {
            Some(session) => format!(
                "{}/previews/{}?session={}",
                self.base_url, key.project_id, session
            ),
            None => format!("{}/previews/{}", self.base_url, key.project_id),
        }
    }

    /// Probe request with the target address percent-encoded; the address is
    /// itself a URL and may carry query characters of its own.
    fn probe_request(&self, url: &str, timeout: Duration) -> reqwest::Result<reqwest::Request> {
        self.client
            .get(format!("{}/previews/health", self.base_url))
            .query(&[
                ("url", url.to_string()),
                ("timeout_ms", timeout.as_millis().to_string()),
            ])
            .build()
    }
}

#[async_trait]
impl PreviewEndpoint for HttpEndpoint {
    async fn fetch_status(&self, key: &WorkspaceKey) -> EndpointResult<StatusSnapshot> {
        let response = self.client.get(self.status_url(key)).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(EndpointError::WorkspaceNotFound);
        }
        if !response.status().is_success() {
            return Err(EndpointError::Api(format!(
                "status request failed with {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    async fn start(&self, key: &WorkspaceKey) -> EndpointResult<StartOutcome> {
        let body = serde_json::json!({
            "project_id": key.project_id,
            "session_id": key.session_id,
        });

        let response = self
            .client
            .post(format!("{}/previews", self.base_url))
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(EndpointError::WorkspaceNotFound);
        }

        // 500s still carry a structured body with the failure detail.
        Ok(response.json().await?)
    }

    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let failed = ProbeOutcome {
            ok: false,
            status: None,
        };

        let request = match self.probe_request(url, timeout) {
            Ok(request) => request,
            Err(e) => {
                debug!("Probe request could not be built: {}", e);
                return failed;
            }
        };

        match self.client.execute(request).await {
            Ok(response) => response.json().await.unwrap_or(failed),
            Err(e) => {
                debug!("Probe request failed: {}", e);
                failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_request_percent_encodes_target() {
        let endpoint = HttpEndpoint::new("http://127.0.0.1:4100");
        let request = endpoint
            .probe_request("http://127.0.0.1:49152/?a=1&b=2", Duration::from_secs(5))
            .unwrap();

        let query = request.url().query().unwrap();
        // The target's own query must not leak into ours.
        assert!(!query.contains("&b=2"));
        assert!(query.contains("%26b%3D2"));
        assert!(query.contains("timeout_ms=5000"));
    }
}
