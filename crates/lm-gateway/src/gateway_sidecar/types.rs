//! Sidecar request/response bodies and the JSON error envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lm_rpc::{CookieItem, RpcError, Session};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// Error payload rendered as `{"error": ..., "details"?: ...}`.
#[derive(Debug)]
pub(super) struct SidecarApiError {
    pub(super) status: StatusCode,
    pub(super) message: String,
    pub(super) details: Option<String>,
}

impl SidecarApiError {
    pub(super) fn new(
        status: StatusCode,
        message: impl Into<String>,
        details: Option<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            details,
        }
    }

    pub(super) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, None)
    }

    pub(super) fn unauthorized_session() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized session", None)
    }

    pub(super) fn internal(message: impl Into<String>, details: Option<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, details)
    }

    pub(super) fn from_bootstrap_error(error: RpcError) -> Self {
        match error {
            RpcError::Validation(message) => Self::bad_request(message),
            extraction @ RpcError::Extraction { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, extraction.to_string(), None)
            }
            RpcError::Auth { status } | RpcError::Upstream { status, .. } => Self::new(
                upstream_status_code(status),
                format!("Bootstrap failed: {status}"),
                None,
            ),
            other => {
                let details = other.details();
                Self::internal(other.to_string(), details)
            }
        }
    }

    pub(super) fn from_execute_error(error: RpcError) -> Self {
        match error {
            RpcError::Validation(message) => Self::bad_request(message),
            RpcError::Auth { .. } => Self::unauthorized_session(),
            RpcError::Upstream { status, details } => {
                Self::new(upstream_status_code(status), "RPC request failed", details)
            }
            extraction @ RpcError::Extraction { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, extraction.to_string(), None)
            }
            other => {
                let details = other.details();
                Self::internal(other.to_string(), details)
            }
        }
    }
}

/// Mirrors the upstream status; anything that cannot be an error status becomes 502.
fn upstream_status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|code| code.is_client_error() || code.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

impl IntoResponse for SidecarApiError {
    fn into_response(self) -> Response {
        let mut payload = json!({ "error": self.message });
        if let Some(details) = self.details {
            payload["details"] = Value::String(details);
        }
        (self.status, Json(payload)).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SessionBootstrapRequest {
    #[serde(default)]
    pub(super) cookie_jar: Option<Vec<CookieItem>>,
    #[serde(default)]
    pub(super) source_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SessionBootstrapResponse {
    pub(super) session: Session,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RpcExecuteRequest {
    #[serde(default)]
    pub(super) cookie_jar: Option<Vec<CookieItem>>,
    #[serde(default)]
    pub(super) session: Option<Session>,
    #[serde(default)]
    pub(super) rpcid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub(super) request_data: Option<Value>,
    #[serde(default)]
    pub(super) source_path: Option<String>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only an omitted field is `None`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
