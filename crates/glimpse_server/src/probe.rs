//! Server-side health probe.
//!
//! Preview containers listen on loopback ports the browser cannot reach
//! across origins, so the probe runs here: one bounded-timeout GET, with
//! every failure mode collapsed to `ok: false`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of a single liveness probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// HTTP probe with a shared client.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Probe an address once. `ok` only for a 200 response; timeouts and
    /// connection failures yield `ok: false` with no status. Never errors.
    pub async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                ProbeOutcome {
                    ok: status == 200,
                    status: Some(status),
                }
            }
            Err(e) => {
                // Expected during boot; keep it quiet.
                debug!("Probe of {} failed: {}", url, e);
                ProbeOutcome {
                    ok: false,
                    status: None,
                }
            }
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_probe_ok_on_200() {
        let url = serve(Router::new().route("/", get(|| async { "ok" }))).await;

        let outcome = HttpProbe::new()
            .probe(&url, Duration::from_secs(2))
            .await;
        assert!(outcome.ok);
        assert_eq!(outcome.status, Some(200));
    }

    #[tokio::test]
    async fn test_probe_not_ok_on_non_200() {
        let url = serve(Router::new().route(
            "/",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let outcome = HttpProbe::new()
            .probe(&url, Duration::from_secs(2))
            .await;
        assert!(!outcome.ok);
        assert_eq!(outcome.status, Some(503));
    }

    #[tokio::test]
    async fn test_probe_not_ok_on_unreachable() {
        let outcome = HttpProbe::new()
            .probe("http://127.0.0.1:1", Duration::from_millis(500))
            .await;
        assert!(!outcome.ok);
        assert_eq!(outcome.status, None);
    }
}
