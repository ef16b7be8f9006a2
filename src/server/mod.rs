// ABOUTME: HTTP control surface: status query, start-update and start-rollback.
// ABOUTME: Validates requests, applies admission control, and serves until shutdown.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::deploy::{self, Orchestrator, Rejected};
use crate::error::{Error, Result};
use crate::types::ImageTag;

/// Body of every non-status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
    pub message: String,
}

impl Ack {
    fn started(message: &str) -> Self {
        Self {
            status: "started".to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    #[serde(default)]
    target_tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RollbackRequest {
    #[serde(default)]
    previous_tag: Option<String>,
}

/// Request failures mapped to an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidTag { field: &'static str, reason: String },

    #[error(transparent)]
    Conflict(#[from] Rejected),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Ack {
            status: "error".to_string(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Router for the control endpoints.
pub fn build_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/updater/status", get(status))
        .route("/updater/update", post(update))
        .route("/updater/rollback", post(rollback))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

async fn status(State(orchestrator): State<Arc<Orchestrator>>) -> Json<deploy::State> {
    Json(orchestrator.status())
}

async fn update(
    State(orchestrator): State<Arc<Orchestrator>>,
    body: Bytes,
) -> std::result::Result<Json<Ack>, ApiError> {
    let request: UpdateRequest = parse_body(&body)?;
    let tag = require_tag("targetTag", request.target_tag)?;

    orchestrator.start_update(tag)?;
    Ok(Json(Ack::started("Update initiated")))
}

async fn rollback(
    State(orchestrator): State<Arc<Orchestrator>>,
    body: Bytes,
) -> std::result::Result<Json<Ack>, ApiError> {
    let request: RollbackRequest = parse_body(&body)?;
    let tag = require_tag("previousTag", request.previous_tag)?;

    orchestrator.start_rollback(tag)?;
    Ok(Json(Ack::started("Rollback initiated")))
}

/// An empty body reads as an empty request.
fn parse_body<T: for<'de> Deserialize<'de> + Default>(
    body: &[u8],
) -> std::result::Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

fn require_tag(
    field: &'static str,
    value: Option<String>,
) -> std::result::Result<ImageTag, ApiError> {
    let value = value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ApiError::Missing(field))?;
    ImageTag::new(&value).map_err(|e| ApiError::InvalidTag {
        field,
        reason: e.to_string(),
    })
}

/// Bind the configured address and serve until SIGINT or SIGTERM.
pub async fn serve(config: &Config, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let addr = config.listen_addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;

    tracing::info!(%addr, "control surface listening");

    axum::serve(listener, build_router(orchestrator))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("control surface stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        tokio::select! {
            _ = ctrl_c() => {},
            _ = terminate() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "failed to install Ctrl+C handler");
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
            tracing::info!("received SIGTERM, shutting down");
        }
        Err(err) => tracing::warn!(?err, "failed to install SIGTERM handler"),
    }
}
