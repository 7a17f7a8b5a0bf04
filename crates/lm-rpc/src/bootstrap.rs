//! Session bootstrap: fetches the authenticated page and scrapes its tokens.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    cookies::cookie_header, CookieItem, RpcError, RpcTransport, Session, TransportMethod,
    TransportRequest,
};

pub const DEFAULT_SESSION_PATH: &str = "/_/PhotosUi/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Session field populated from a scraped token.
pub enum SessionField {
    Account,
    FSid,
    Bl,
    Path,
    At,
    Rapt,
}

impl SessionField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::FSid => "fSid",
            Self::Bl => "bl",
            Self::Path => "path",
            Self::At => "at",
            Self::Rapt => "rapt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTokenField {
    pub field: SessionField,
    pub key: &'static str,
    pub required: bool,
}

/// Page-bootstrap keys for each session token. Renames upstream are edits here.
pub const SESSION_TOKEN_FIELDS: &[SessionTokenField] = &[
    SessionTokenField {
        field: SessionField::Account,
        key: "oPEP7c",
        required: false,
    },
    SessionTokenField {
        field: SessionField::FSid,
        key: "FdrFJe",
        required: true,
    },
    SessionTokenField {
        field: SessionField::Bl,
        key: "cfb2h",
        required: true,
    },
    SessionTokenField {
        field: SessionField::Path,
        key: "eptZe",
        required: false,
    },
    SessionTokenField {
        field: SessionField::At,
        key: "SNlM0e",
        required: true,
    },
    SessionTokenField {
        field: SessionField::Rapt,
        key: "Dbw5Ud",
        required: false,
    },
];

/// Finds the first `"<key>":"<value>"` pair with a non-empty, quote-terminated
/// value in `html` and unescapes the value.
pub fn extract_token(html: &str, key: &str) -> Option<String> {
    let prefix = format!("\"{key}\":\"");
    html.match_indices(prefix.as_str()).find_map(|(index, _)| {
        let rest = &html[index + prefix.len()..];
        let end = rest.find('"')?;
        (end > 0).then(|| unescape_token_value(&rest[..end]))
    })
}

/// Applies exactly three substitutions, in order; nothing else is decoded.
pub fn unescape_token_value(raw: &str) -> String {
    raw.replace("\\u003d", "=")
        .replace("\\u0026", "&")
        .replace("\\/", "/")
}

/// Builds a [`Session`] from the bootstrap page body.
pub fn extract_session(html: &str, default_path: &str) -> Result<Session, RpcError> {
    let mut session = Session::default();
    let mut missing = Vec::new();

    for entry in SESSION_TOKEN_FIELDS {
        let value = extract_token(html, entry.key);
        if value.is_none() && entry.required {
            missing.push(entry.field.as_str());
        }
        match entry.field {
            SessionField::Account => session.account = value,
            SessionField::FSid => session.f_sid = value.unwrap_or_default(),
            SessionField::Bl => session.bl = value.unwrap_or_default(),
            SessionField::Path => {
                session.path = value.unwrap_or_else(|| default_path.to_string())
            }
            SessionField::At => session.at = value.unwrap_or_default(),
            SessionField::Rapt => session.rapt = value,
        }
    }

    if !missing.is_empty() {
        return Err(RpcError::Extraction { missing });
    }
    Ok(session)
}

#[derive(Clone)]
/// Fetches the page at a source path with the caller's cookies and extracts a session.
pub struct SessionBootstrapper {
    transport: Arc<dyn RpcTransport>,
    origin: String,
    default_path: String,
}

impl SessionBootstrapper {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        origin: impl Into<String>,
        default_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            origin: origin.into().trim_end_matches('/').to_string(),
            default_path: default_path.into(),
        }
    }

    pub async fn bootstrap(
        &self,
        cookie_jar: &[CookieItem],
        source_path: &str,
    ) -> Result<Session, RpcError> {
        if cookie_jar.is_empty() {
            return Err(RpcError::validation("cookieJar is required"));
        }

        let request = TransportRequest {
            method: TransportMethod::Get,
            url: format!("{}{}", self.origin, source_path),
            headers: vec![("Cookie".to_string(), cookie_header(cookie_jar))],
            body: None,
        };
        debug!(source_path, cookies = cookie_jar.len(), "session bootstrap started");

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            debug!(status = response.status, "session bootstrap rejected");
            return Err(RpcError::Upstream {
                status: response.status,
                details: None,
            });
        }

        extract_session(&response.body, &self.default_path).inspect_err(|error| {
            if let RpcError::Extraction { missing } = error {
                warn!(
                    missing = missing.join(","),
                    "bootstrap page lacked required session tokens"
                );
            }
        })
    }
}
