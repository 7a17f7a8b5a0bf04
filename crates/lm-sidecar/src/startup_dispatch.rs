//! Chooses between the long-running service and the one-shot modes.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use lm_gateway::{run_sidecar_server, SidecarServerConfig};
use lm_rpc::{
    load_cookie_jar, CookieItem, ReqwestTransportConfig, RpcClient, RpcClientConfig, Session,
};
use serde_json::Value;
use tracing::info;

use crate::cli_args::Cli;

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let client = Arc::new(build_rpc_client(&cli)?);

    if cli.session_bootstrap {
        return run_session_bootstrap(&cli, &client).await;
    }
    if cli.rpc_execute {
        return run_rpc_execute(&cli, &client).await;
    }

    run_sidecar_server(build_server_config(&cli, client)).await
}

pub(crate) fn build_rpc_client(cli: &Cli) -> Result<RpcClient> {
    let config = RpcClientConfig {
        origin: cli.upstream_origin.clone(),
        error_body_limit: cli.error_body_limit,
        ..RpcClientConfig::default()
    };
    let transport_config = ReqwestTransportConfig {
        request_timeout_ms: cli.request_timeout_ms,
    };
    RpcClient::with_reqwest(config, transport_config).context("failed to build upstream http client")
}

pub(crate) fn build_server_config(cli: &Cli, client: Arc<RpcClient>) -> SidecarServerConfig {
    let mut config = SidecarServerConfig::new(client);
    config.bind = cli.bind.clone();
    config.allowed_origins = cli.allowed_origins.clone();
    config.max_body_bytes = cli.max_body_bytes;
    config
}

async fn run_session_bootstrap(cli: &Cli, client: &RpcClient) -> Result<()> {
    let cookie_file = cli
        .cookie_file
        .as_deref()
        .context("--session-bootstrap requires --cookie-file")?;
    let cookie_jar = load_cookie_jar_file(cookie_file)?;
    info!(cookies = cookie_jar.len(), source_path = %cli.source_path, "bootstrapping session");

    let session = client
        .bootstrap(&cookie_jar, &cli.source_path)
        .await
        .context("session bootstrap failed")?;
    print_json(&session)
}

async fn run_rpc_execute(cli: &Cli, client: &RpcClient) -> Result<()> {
    let cookie_file = cli
        .cookie_file
        .as_deref()
        .context("--rpc-execute requires --cookie-file")?;
    let session_file = cli
        .session_file
        .as_deref()
        .context("--rpc-execute requires --session-file")?;
    let rpcid = cli
        .rpcid
        .as_deref()
        .context("--rpc-execute requires --rpcid")?;

    let cookie_jar = load_cookie_jar_file(cookie_file)?;
    let session = load_session_file(session_file)?;
    let request_data = parse_request_data(&cli.request_data)?;
    info!(rpcid, source_path = %cli.source_path, "executing rpc");

    let execution = client
        .execute(&cookie_jar, session, rpcid, Some(&request_data), &cli.source_path)
        .await
        .with_context(|| format!("rpc '{rpcid}' failed"))?;
    print_json(&execution)
}

pub(crate) fn load_cookie_jar_file(path: &Path) -> Result<Vec<CookieItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read cookie file {}", path.display()))?;
    let cookie_jar = load_cookie_jar(&raw)
        .with_context(|| format!("failed to parse cookie file {}", path.display()))?;
    if cookie_jar.is_empty() {
        anyhow::bail!("cookie file {} contains no cookies", path.display());
    }
    Ok(cookie_jar)
}

/// Accepts a bare session object or the `{"session": ...}` bootstrap response.
pub(crate) fn load_session_file(path: &Path) -> Result<Session> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read session file {}", path.display()))?;
    let mut value = serde_json::from_str::<Value>(&raw)
        .with_context(|| format!("failed to parse session file {}", path.display()))?;
    if let Some(inner) = value.get_mut("session") {
        value = inner.take();
    }
    serde_json::from_value(value)
        .with_context(|| format!("invalid session in {}", path.display()))
}

pub(crate) fn parse_request_data(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).context("--request-data must be valid JSON")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
