//! Batched-call wire envelope: request encoding and response unwinding.
//!
//! Outbound, a call travels as `f.req=<[[[rpcid, "<json>", null, "generic"]]]>`
//! with the payload JSON-encoded inside the JSON envelope. Inbound, the payload
//! sits at `[0][2]` of the first `wrb.fr` line, again as a JSON string.

use serde_json::{json, Value};

use crate::{RpcError, Session};

pub const ENVELOPE_MARKER: &str = "wrb.fr";
pub const BATCH_EXECUTE_SUFFIX: &str = "data/batchexecute";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";
const ENVELOPE_MODE: &str = "generic";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Wire-ready form of one call.
pub struct EncodedRpcRequest {
    pub url: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct RpcEnvelopeCodec {
    origin: String,
    error_body_limit: usize,
}

impl RpcEnvelopeCodec {
    pub fn new(origin: impl Into<String>, error_body_limit: usize) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            error_body_limit,
        }
    }

    /// Builds the form body and query for one call. An absent `request_data`
    /// leaves a literal `null` in the payload slot; a present one, `null`
    /// included, is carried as its JSON text.
    pub fn encode_request(
        &self,
        rpcid: &str,
        request_data: Option<&Value>,
        session: &Session,
        source_path: &str,
    ) -> EncodedRpcRequest {
        let payload = request_data.map_or(Value::Null, |data| Value::String(data.to_string()));
        let envelope = json!([[[rpcid, payload, Value::Null, ENVELOPE_MODE]]]);
        let body = format!(
            "f.req={}&at={}&",
            urlencoding::encode(&envelope.to_string()),
            urlencoding::encode(&session.at)
        );

        let mut params = vec![
            ("rpcids", rpcid),
            ("source-path", source_path),
            ("f.sid", session.f_sid.as_str()),
            ("bl", session.bl.as_str()),
            ("pageId", "none"),
            ("rt", "c"),
        ];
        if let Some(rapt) = session.rapt.as_deref().filter(|rapt| !rapt.is_empty()) {
            params.push(("rapt", rapt));
        }
        let query = params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!(
            "{}{}{}?{}",
            self.origin, session.path, BATCH_EXECUTE_SUFFIX, query
        );

        EncodedRpcRequest { url, body }
    }

    /// Selects the first marker line and unwinds both JSON layers.
    pub fn decode_response(&self, raw_body: &str) -> Result<Value, RpcError> {
        if raw_body.trim().is_empty() {
            return Err(RpcError::parse("empty response body", None));
        }

        let Some(line) = raw_body
            .split('\n')
            .map(str::trim)
            .find(|line| line.contains(ENVELOPE_MARKER))
        else {
            return Err(RpcError::parse(
                "no envelope marker found",
                Some(truncate_chars(raw_body, self.error_body_limit)),
            ));
        };

        let envelope: Value = serde_json::from_str(line).map_err(|error| {
            RpcError::parse(
                format!("invalid envelope json: {error}"),
                Some(truncate_chars(line, self.error_body_limit)),
            )
        })?;

        let payload = envelope
            .get(0)
            .and_then(|entry| entry.get(2))
            .and_then(Value::as_str)
            .filter(|payload| !payload.is_empty())
            .ok_or_else(|| {
                RpcError::parse(
                    "missing payload",
                    Some(truncate_chars(line, self.error_body_limit)),
                )
            })?;

        serde_json::from_str(payload).map_err(|error| {
            RpcError::parse(
                format!("invalid payload json: {error}"),
                Some(truncate_chars(payload, self.error_body_limit)),
            )
        })
    }
}

/// Truncates to at most `limit` characters without splitting one.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}
