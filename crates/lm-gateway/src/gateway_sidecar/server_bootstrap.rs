//! Sidecar server bootstrap and router wiring.

use super::*;

/// Binds `config.bind` and serves until Ctrl-C.
pub async fn run_sidecar_server(config: SidecarServerConfig) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}'", config.bind))?;

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind sidecar server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound sidecar server address")?;

    let app = build_sidecar_router(config)?;
    info!(
        addr = %local_addr,
        bootstrap_endpoint = SESSION_BOOTSTRAP_ENDPOINT,
        execute_endpoint = RPC_EXECUTE_ENDPOINT,
        "sidecar server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("sidecar server exited unexpectedly")?;

    info!("sidecar server stopped");
    Ok(())
}

/// Builds the service router from an explicit configuration value.
pub fn build_sidecar_router(config: SidecarServerConfig) -> Result<Router> {
    let cors = build_cors_layer(&config.allowed_origins)?;
    let max_body_bytes = config.max_body_bytes;
    let state = Arc::new(SidecarServerState::new(config));

    Ok(Router::new()
        .route(HEALTH_ENDPOINT, get(handle_health))
        .route(SESSION_BOOTSTRAP_ENDPOINT, post(handle_session_bootstrap))
        .route(RPC_EXECUTE_ENDPOINT, post(handle_rpc_execute))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn build_cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() || allowed_origins.iter().any(|origin| origin == ANY_ORIGIN) {
        return Ok(layer.allow_origin(Any));
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("invalid allowed origin '{origin}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}
