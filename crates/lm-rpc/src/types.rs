use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// One entry of the caller's authenticated cookie jar.
pub struct CookieItem {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

impl CookieItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
/// Ephemeral credentials scraped from the authenticated bootstrap page.
///
/// Sessions are only produced by a successful bootstrap and are never mutated
/// afterwards; a re-bootstrap yields a replacement value.
pub struct Session {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub f_sid: String,
    pub bl: String,
    pub path: String,
    pub at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rapt: Option<String>,
}

impl Session {
    /// A session can carry calls only when all four routing tokens are present.
    pub fn is_usable(&self) -> bool {
        !self.f_sid.is_empty() && !self.bl.is_empty() && !self.at.is_empty() && !self.path.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Decoded payload of one call together with the session that carried it.
pub struct RpcExecution {
    pub data: Value,
    pub session: Session,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Classification callers use to pick a remediation.
pub enum RpcErrorKind {
    ValidationError,
    ExtractionError,
    AuthError,
    UpstreamError,
    ParseError,
}

impl RpcErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::ExtractionError => "extraction_error",
            Self::AuthError => "auth_error",
            Self::UpstreamError => "upstream_error",
            Self::ParseError => "parse_error",
        }
    }
}

#[derive(Debug, Error)]
/// Enumerates classified failures of bootstrap and execute.
pub enum RpcError {
    #[error("{0}")]
    Validation(String),
    #[error("Unable to extract required session fields (fSid/bl/at). Refresh cookies and retry.")]
    Extraction { missing: Vec<&'static str> },
    #[error("upstream rejected the session with status {status}")]
    Auth { status: u16 },
    #[error("upstream returned non-success status {status}")]
    Upstream {
        status: u16,
        details: Option<String>,
    },
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("{message}")]
    Parse {
        message: String,
        details: Option<String>,
    },
}

impl RpcError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn parse(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Parse {
            message: message.into(),
            details,
        }
    }

    pub fn kind(&self) -> RpcErrorKind {
        match self {
            Self::Validation(_) => RpcErrorKind::ValidationError,
            Self::Extraction { .. } => RpcErrorKind::ExtractionError,
            Self::Auth { .. } => RpcErrorKind::AuthError,
            Self::Upstream { .. } | Self::Transport(_) => RpcErrorKind::UpstreamError,
            Self::Parse { .. } => RpcErrorKind::ParseError,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn details(&self) -> Option<String> {
        match self {
            Self::Extraction { missing } => Some(missing.join(",")),
            Self::Upstream { details, .. } | Self::Parse { details, .. } => details.clone(),
            Self::Validation(_) | Self::Auth { .. } | Self::Transport(_) => None,
        }
    }

    /// HTTP status observed upstream, when the failure came with one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Auth { status } | Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Fully-formed outbound request handed to an [`RpcTransport`].
pub struct TransportRequest {
    pub method: TransportMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransportRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Final response after redirects.
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
/// No HTTP response could be obtained.
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
/// Trait contract for the HTTP boundary that supplies cookies and reads responses.
pub trait RpcTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::{CookieItem, RpcError, RpcErrorKind, Session, TransportError};
    use serde_json::json;

    #[test]
    fn unit_session_serializes_camel_case_and_omits_absent_annotations() {
        let session = Session {
            account: None,
            f_sid: "fsid123".to_string(),
            bl: "bl1".to_string(),
            path: "/_/PhotosUi/".to_string(),
            at: "tok1".to_string(),
            rapt: None,
        };

        let value = serde_json::to_value(&session).expect("serialize session");
        assert_eq!(
            value,
            json!({
                "fSid": "fsid123",
                "bl": "bl1",
                "path": "/_/PhotosUi/",
                "at": "tok1",
            })
        );
    }

    #[test]
    fn unit_session_deserializes_missing_fields_as_empty() {
        let session: Session =
            serde_json::from_value(json!({ "fSid": "f", "rapt": "r" })).expect("parse session");
        assert_eq!(session.f_sid, "f");
        assert_eq!(session.rapt.as_deref(), Some("r"));
        assert!(session.bl.is_empty());
        assert!(!session.is_usable());
    }

    #[test]
    fn unit_session_usability_requires_all_routing_tokens() {
        let mut session = Session {
            account: Some("user@example.com".to_string()),
            f_sid: "f".to_string(),
            bl: "b".to_string(),
            path: "/p/".to_string(),
            at: "a".to_string(),
            rapt: None,
        };
        assert!(session.is_usable());
        session.path.clear();
        assert!(!session.is_usable());
    }

    #[test]
    fn unit_cookie_item_accepts_minimal_shape() {
        let cookie: CookieItem =
            serde_json::from_value(json!({ "name": "SID", "value": "abc" })).expect("cookie");
        assert_eq!(cookie, CookieItem::new("SID", "abc"));
        assert_eq!(
            serde_json::to_value(&cookie).expect("serialize"),
            json!({ "name": "SID", "value": "abc" })
        );
    }

    #[test]
    fn conformance_error_kinds_are_never_merged() {
        let cases = [
            (RpcError::validation("rpcid is required"), RpcErrorKind::ValidationError),
            (
                RpcError::Extraction {
                    missing: vec!["fSid"],
                },
                RpcErrorKind::ExtractionError,
            ),
            (RpcError::Auth { status: 403 }, RpcErrorKind::AuthError),
            (
                RpcError::Upstream {
                    status: 500,
                    details: None,
                },
                RpcErrorKind::UpstreamError,
            ),
            (
                RpcError::Transport(TransportError::Other("connection reset".to_string())),
                RpcErrorKind::UpstreamError,
            ),
            (
                RpcError::parse("missing payload", None),
                RpcErrorKind::ParseError,
            ),
        ];
        for (error, kind) in cases {
            assert_eq!(error.kind(), kind, "{error}");
        }
        assert_eq!(RpcErrorKind::AuthError.as_str(), "auth_error");
    }

    #[test]
    fn unit_extraction_error_lists_missing_fields_as_details() {
        let error = RpcError::Extraction {
            missing: vec!["fSid", "at"],
        };
        assert_eq!(error.details().as_deref(), Some("fSid,at"));
        assert!(error.message().contains("Refresh cookies"));
    }
}
