//! Main HTTP Gateway Server.
//!
//! Thin plumbing over the chat pipeline: request bodies in, a stream of
//! newline-delimited JSON pipeline events out.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    routing::post,
    Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use mnemo_agent::ChatPipeline;
use mnemo_core::{ChatRequest, PipelineEvent, SessionMemory};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<ChatPipeline>,
}

/// Build the Axum router with all API routes.
pub fn build_router(state: GatewayState, api_version: &str) -> Router {
    let chat_path = format!("/api/{api_version}/chat");
    let session_path = format!("{chat_path}/session/:session_id");

    Router::new()
        .route(&chat_path, post(chat))
        .route(&session_path, get(get_session).delete(clear_session))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP server.
#[instrument(skip(state))]
pub async fn start_server(
    addr: SocketAddr,
    state: GatewayState,
    api_version: &str,
) -> Result<()> {
    let app = build_router(state, api_version);

    info!("Gateway HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "mnemo",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Chat endpoint: runs the pipeline and streams its events as NDJSON,
/// terminating after the answer event.
async fn chat(State(state): State<GatewayState>, Json(request): Json<ChatRequest>) -> Response {
    let rx = state.pipeline.spawn(request);
    let stream =
        ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(event_line(&event)));

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(stream),
    )
        .into_response()
}

fn event_line(event: &PipelineEvent) -> String {
    let mut line = serde_json::to_string(event).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialize pipeline event");
        r#"{"type":"pipeline_step","content":"event serialization failed"}"#.to_string()
    });
    line.push('\n');
    line
}

/// Return the persisted memory for a session (or a fresh empty one).
async fn get_session(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> Json<SessionMemory> {
    Json(state.pipeline.memory().load(&session_id).await)
}

/// Delete a session's persisted memory. Succeeds whether or not it existed.
async fn clear_session(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    match state.pipeline.memory().delete(&session_id).await {
        Ok(()) => Ok(Json(json!({ "message": format!("Session {session_id} cleared") }))),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to clear session");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
