//! HTTP surface for the preview service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use glimpse_core::{CoreError, RefreshBus, RefreshEvent, WorkspaceKey, WorkspaceResolver};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::orchestrator::PreviewOrchestrator;
use crate::probe::HttpProbe;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PreviewOrchestrator>,
    pub resolver: WorkspaceResolver,
    pub probe: HttpProbe,
    pub bus: RefreshBus,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<PreviewOrchestrator>,
        resolver: WorkspaceResolver,
        bus: RefreshBus,
        config: ServerConfig,
    ) -> Self {
        Self {
            orchestrator,
            resolver,
            probe: HttpProbe::new(),
            bus,
            config,
        }
    }
}

/// Build the service router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(service_health))
        .route("/previews", post(start_preview))
        .route("/previews/health", get(probe_preview))
        .route("/previews/refresh", post(publish_refresh))
        .route(
            "/previews/:project_id",
            get(get_preview).delete(stop_preview),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreviewStatusResponse {
    pub running: bool,
    pub is_responding: bool,
    pub preview_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartPreviewRequest {
    pub project_id: i64,
    pub session_id: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub requesting_user: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartPreviewResponse {
    pub success: bool,
    pub url: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    pub url: String,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// Build and validate the workspace key for a request, failing the request
/// chain early when the workspace is unusable.
fn validated_key(
    state: &AppState,
    project_id: i64,
    session: Option<String>,
) -> ServerResult<WorkspaceKey> {
    let key = WorkspaceKey::new(project_id, session).map_err(|e| match e {
        CoreError::InvalidSessionId(s) => ServerError::InvalidRequest(format!("session id {:?}", s)),
        other => ServerError::InvalidRequest(other.to_string()),
    })?;

    if !state.resolver.validate(&key) {
        return Err(ServerError::WorkspaceNotFound(key.to_string()));
    }

    Ok(key)
}

/// Liveness of the service itself.
async fn service_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Current preview status; starts an instance implicitly when none runs.
async fn get_preview(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Query(query): Query<SessionQuery>,
) -> ServerResult<Json<PreviewStatusResponse>> {
    let key = validated_key(&state, project_id, query.session)?;

    let mut status = state.orchestrator.status(&key).await;
    if !status.running {
        state
            .orchestrator
            .start(&key, HashMap::new(), None)
            .await?;
        status = state.orchestrator.status(&key).await;
    }

    Ok(Json(PreviewStatusResponse {
        running: status.running,
        is_responding: status.responding,
        preview_url: status.url,
    }))
}

/// Explicitly start (or reuse) a preview.
async fn start_preview(
    State(state): State<AppState>,
    Json(request): Json<StartPreviewRequest>,
) -> Result<Response, ServerError> {
    let key = validated_key(&state, request.project_id, request.session_id)?;

    let was_running = state.orchestrator.status(&key).await.running;

    match state
        .orchestrator
        .start(&key, request.env, request.requesting_user)
        .await
    {
        Ok(url) => {
            let status = if was_running { "running" } else { "starting" };
            Ok(Json(StartPreviewResponse {
                success: true,
                url: Some(url),
                status: Some(status.to_string()),
                error: None,
            })
            .into_response())
        }
        Err(e @ (ServerError::StartFailed(_) | ServerError::LockTimeout)) => Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StartPreviewResponse {
                success: false,
                url: None,
                status: None,
                error: Some(e.to_string()),
            }),
        )
            .into_response()),
        Err(e) => Err(e),
    }
}

/// Tear down a preview.
async fn stop_preview(
    State(state): State<AppState>,
    Path(project_id): Path<i64>,
    Query(query): Query<SessionQuery>,
) -> ServerResult<Json<StopResponse>> {
    let key = WorkspaceKey::new(project_id, query.session)
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
    let stopped = state.orchestrator.stop(&key).await?;
    Ok(Json(StopResponse { stopped }))
}

/// Server-side probe passthrough for the browser-side state machine.
async fn probe_preview(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> Json<crate::probe::ProbeOutcome> {
    let timeout = query
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| state.config.probe_timeout());

    let outcome = state.probe.probe(&query.url, timeout).await;
    if outcome.ok {
        state.orchestrator.mark_responding_by_url(&query.url);
    }

    Json(outcome)
}

/// Entry point for the agent pipeline: announce that a workspace changed.
async fn publish_refresh(
    State(state): State<AppState>,
    Json(event): Json<RefreshEvent>,
) -> Json<serde_json::Value> {
    info!(
        "Refresh requested for project {} session {:?}",
        event.project_id, event.session_id
    );
    let subscribers = state.bus.publish(event);
    Json(json!({ "subscribers": subscribers }))
}
