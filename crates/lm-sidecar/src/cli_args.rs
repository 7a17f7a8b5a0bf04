use std::path::PathBuf;

use clap::Parser;
use lm_gateway::{DEFAULT_MAX_BODY_BYTES, DEFAULT_SIDECAR_BIND};
use lm_rpc::{
    DEFAULT_ERROR_BODY_LIMIT, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SOURCE_PATH,
    DEFAULT_UPSTREAM_ORIGIN,
};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "lm-sidecar",
    about = "Session bootstrap and batched RPC sidecar",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "LM_SIDECAR_BIND",
        default_value = DEFAULT_SIDECAR_BIND,
        help = "Socket address for the HTTP service (host:port)"
    )]
    pub(crate) bind: String,

    #[arg(
        long = "allowed-origin",
        env = "LM_SIDECAR_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "*",
        help = "CORS origin allowed to call the service; repeat or comma-separate. '*' allows any origin"
    )]
    pub(crate) allowed_origins: Vec<String>,

    #[arg(
        long = "max-body-bytes",
        env = "LM_SIDECAR_MAX_BODY_BYTES",
        default_value_t = DEFAULT_MAX_BODY_BYTES,
        value_parser = parse_positive_usize,
        help = "Maximum accepted JSON request body size in bytes"
    )]
    pub(crate) max_body_bytes: usize,

    #[arg(
        long = "upstream-origin",
        env = "LM_SIDECAR_UPSTREAM_ORIGIN",
        default_value = DEFAULT_UPSTREAM_ORIGIN,
        help = "Origin of the upstream web application"
    )]
    pub(crate) upstream_origin: String,

    #[arg(
        long = "request-timeout-ms",
        env = "LM_SIDECAR_REQUEST_TIMEOUT_MS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Timeout in milliseconds for each upstream request"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long = "error-body-limit",
        env = "LM_SIDECAR_ERROR_BODY_LIMIT",
        default_value_t = DEFAULT_ERROR_BODY_LIMIT,
        value_parser = parse_positive_usize,
        help = "Maximum characters of an upstream body echoed back in error details"
    )]
    pub(crate) error_body_limit: usize,

    #[arg(
        long = "session-bootstrap",
        conflicts_with = "rpc_execute",
        requires = "cookie_file",
        help = "Bootstrap a session once, print it as JSON, and exit"
    )]
    pub(crate) session_bootstrap: bool,

    #[arg(
        long = "rpc-execute",
        requires_all = ["cookie_file", "session_file", "rpcid"],
        help = "Execute one RPC with a stored session, print the result as JSON, and exit"
    )]
    pub(crate) rpc_execute: bool,

    #[arg(
        long = "cookie-file",
        env = "LM_SIDECAR_COOKIE_FILE",
        help = "Cookie jar file: JSON array, Netscape cookies.txt, or a Cookie header string"
    )]
    pub(crate) cookie_file: Option<PathBuf>,

    #[arg(
        long = "session-file",
        requires = "rpc_execute",
        help = "JSON session file produced by --session-bootstrap"
    )]
    pub(crate) session_file: Option<PathBuf>,

    #[arg(long, requires = "rpc_execute", help = "RPC identifier to execute")]
    pub(crate) rpcid: Option<String>,

    #[arg(
        long = "request-data",
        default_value = "null",
        help = "Inline JSON request payload for --rpc-execute"
    )]
    pub(crate) request_data: String,

    #[arg(
        long = "source-path",
        default_value = DEFAULT_SOURCE_PATH,
        help = "Upstream page path the call is issued from"
    )]
    pub(crate) source_path: String,
}
