use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lm_rpc::{RpcClient, DEFAULT_SOURCE_PATH};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

mod endpoints;
mod server_bootstrap;
mod types;

use endpoints::{ANY_ORIGIN, HEALTH_ENDPOINT, RPC_EXECUTE_ENDPOINT, SESSION_BOOTSTRAP_ENDPOINT};
pub use server_bootstrap::{build_sidecar_router, run_sidecar_server};
use types::{RpcExecuteRequest, SessionBootstrapRequest, SessionBootstrapResponse, SidecarApiError};

pub const DEFAULT_SIDECAR_BIND: &str = "127.0.0.1:8787";
/// Matches the JSON body limit of the service this sidecar replaces.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone)]
/// Public struct `SidecarServerConfig` used across the sidecar crates.
pub struct SidecarServerConfig {
    pub client: Arc<RpcClient>,
    pub bind: String,
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl SidecarServerConfig {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self {
            client,
            bind: DEFAULT_SIDECAR_BIND.to_string(),
            allowed_origins: vec![ANY_ORIGIN.to_string()],
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Clone)]
struct SidecarServerState {
    config: SidecarServerConfig,
}

impl SidecarServerState {
    fn new(config: SidecarServerConfig) -> Self {
        Self { config }
    }
}

fn parse_gateway_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, SidecarApiError> {
    serde_json::from_slice::<T>(body).map_err(|error| {
        SidecarApiError::bad_request(format!("failed to parse request body: {error}"))
    })
}

fn resolve_source_path(source_path: Option<&str>) -> &str {
    source_path
        .filter(|path| !path.is_empty())
        .unwrap_or(DEFAULT_SOURCE_PATH)
}

async fn handle_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

async fn handle_session_bootstrap(
    State(state): State<Arc<SidecarServerState>>,
    body: Bytes,
) -> Response {
    let request = match parse_gateway_json_body::<SessionBootstrapRequest>(&body) {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };
    let cookie_jar = request.cookie_jar.unwrap_or_default();
    let source_path = resolve_source_path(request.source_path.as_deref());

    match state.config.client.bootstrap(&cookie_jar, source_path).await {
        Ok(session) => (StatusCode::OK, Json(SessionBootstrapResponse { session })).into_response(),
        Err(error) => SidecarApiError::from_bootstrap_error(error).into_response(),
    }
}

async fn handle_rpc_execute(
    State(state): State<Arc<SidecarServerState>>,
    body: Bytes,
) -> Response {
    let request = match parse_gateway_json_body::<RpcExecuteRequest>(&body) {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };
    let cookie_jar = request.cookie_jar.unwrap_or_default();
    let session = request.session.unwrap_or_default();
    let rpcid = request.rpcid.unwrap_or_default();
    let source_path = resolve_source_path(request.source_path.as_deref());

    match state
        .config
        .client
        .execute(
            &cookie_jar,
            session,
            &rpcid,
            request.request_data.as_ref(),
            source_path,
        )
        .await
    {
        Ok(execution) => (StatusCode::OK, Json(execution)).into_response(),
        Err(error) => SidecarApiError::from_execute_error(error).into_response(),
    }
}
