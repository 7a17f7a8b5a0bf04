use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    bootstrap::{SessionBootstrapper, DEFAULT_SESSION_PATH},
    cookies::cookie_header,
    envelope::{truncate_chars, RpcEnvelopeCodec, FORM_CONTENT_TYPE},
    transport::{ReqwestTransport, ReqwestTransportConfig},
    CookieItem, RpcError, RpcExecution, RpcTransport, Session, TransportError, TransportMethod,
    TransportRequest,
};

pub const DEFAULT_UPSTREAM_ORIGIN: &str = "https://photos.google.com";
pub const DEFAULT_SOURCE_PATH: &str = "/";
/// Upper bound on upstream error bodies echoed back as details.
pub const DEFAULT_ERROR_BODY_LIMIT: usize = 3_000;

#[derive(Debug, Clone)]
/// Public struct `RpcClientConfig` used across the sidecar crates.
pub struct RpcClientConfig {
    pub origin: String,
    pub error_body_limit: usize,
    pub default_session_path: String,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_UPSTREAM_ORIGIN.to_string(),
            error_body_limit: DEFAULT_ERROR_BODY_LIMIT,
            default_session_path: DEFAULT_SESSION_PATH.to_string(),
        }
    }
}

#[derive(Clone)]
/// Runs bootstrap and single-call execution against the batched RPC endpoint.
///
/// The client keeps no per-call state: cookies and sessions are supplied on
/// every invocation and never retained, so one instance may serve concurrent
/// calls for any number of accounts.
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    bootstrapper: SessionBootstrapper,
    codec: RpcEnvelopeCodec,
    error_body_limit: usize,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>, config: RpcClientConfig) -> Self {
        let bootstrapper = SessionBootstrapper::new(
            Arc::clone(&transport),
            config.origin.clone(),
            config.default_session_path,
        );
        let codec = RpcEnvelopeCodec::new(config.origin, config.error_body_limit);
        Self {
            transport,
            bootstrapper,
            codec,
            error_body_limit: config.error_body_limit,
        }
    }

    pub fn with_reqwest(
        config: RpcClientConfig,
        transport_config: ReqwestTransportConfig,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(transport_config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub async fn bootstrap(
        &self,
        cookie_jar: &[CookieItem],
        source_path: &str,
    ) -> Result<Session, RpcError> {
        self.bootstrapper.bootstrap(cookie_jar, source_path).await
    }

    /// Executes one call. The returned session is the one passed in, unchanged.
    pub async fn execute(
        &self,
        cookie_jar: &[CookieItem],
        session: Session,
        rpcid: &str,
        request_data: Option<&Value>,
        source_path: &str,
    ) -> Result<RpcExecution, RpcError> {
        validate_execute_inputs(cookie_jar, &session, rpcid)?;

        let encoded = self
            .codec
            .encode_request(rpcid, request_data, &session, source_path);
        let request = TransportRequest {
            method: TransportMethod::Post,
            url: encoded.url,
            headers: vec![
                ("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()),
                ("Cookie".to_string(), cookie_header(cookie_jar)),
            ],
            body: Some(encoded.body),
        };
        debug!(rpcid, source_path, "rpc execute started");

        let response = self.transport.send(request).await?;
        let status = response.status;
        if status == 401 || status == 403 {
            warn!(rpcid, status, "upstream rejected session; re-bootstrap required");
            return Err(RpcError::Auth { status });
        }
        if !response.is_success() {
            debug!(rpcid, status, "rpc execute failed upstream");
            return Err(RpcError::Upstream {
                status,
                details: Some(truncate_chars(&response.body, self.error_body_limit)),
            });
        }

        let data = self.codec.decode_response(&response.body)?;
        debug!(rpcid, status, "rpc execute completed");
        Ok(RpcExecution { data, session })
    }
}

fn validate_execute_inputs(
    cookie_jar: &[CookieItem],
    session: &Session,
    rpcid: &str,
) -> Result<(), RpcError> {
    if cookie_jar.is_empty() {
        return Err(RpcError::validation("cookieJar is required"));
    }
    if !session.is_usable() {
        return Err(RpcError::validation("session fSid/bl/path/at is required"));
    }
    if rpcid.is_empty() {
        return Err(RpcError::validation("rpcid is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{RpcClient, RpcClientConfig, DEFAULT_SOURCE_PATH};
    use crate::{
        CookieItem, RpcError, RpcErrorKind, RpcTransport, Session, TransportError,
        TransportMethod, TransportRequest, TransportResponse,
    };

    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<TransportResponse>>,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl ScriptedTransport {
        fn with_responses(responses: Vec<(u16, String)>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|(status, body)| TransportResponse { status, body })
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn recorded(&self) -> Vec<TransportRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    #[async_trait]
    impl RpcTransport for ScriptedTransport {
        async fn send(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.requests.lock().expect("requests lock").push(request);
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .ok_or_else(|| TransportError::Other("no scripted response".to_string()))
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl RpcTransport for FailingTransport {
        async fn send(
            &self,
            _request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            Err(TransportError::Other("connection refused".to_string()))
        }
    }

    fn jar() -> Vec<CookieItem> {
        vec![CookieItem::new("SID", "abc")]
    }

    fn session() -> Session {
        Session {
            account: None,
            f_sid: "fsid123".to_string(),
            bl: "bl1".to_string(),
            path: "/_/PhotosUi/".to_string(),
            at: "tok1".to_string(),
            rapt: None,
        }
    }

    fn wrb_body(payload: &Value) -> String {
        let envelope = json!([["wrb.fr", "op.get", payload.to_string(), null, null, null, "generic"]]);
        format!(")]}}'\n\n{}\n{envelope}\n", envelope.to_string().len())
    }

    fn client(transport: Arc<dyn RpcTransport>) -> RpcClient {
        RpcClient::new(transport, RpcClientConfig::default())
    }

    #[tokio::test]
    async fn functional_execute_posts_form_body_with_cookie_and_content_type() {
        let transport = ScriptedTransport::with_responses(vec![(200, wrb_body(&json!([1])))]);
        let execution = client(transport.clone())
            .execute(&jar(), session(), "abc123", Some(&json!({"x": 1})), "/")
            .await
            .expect("execute");
        assert_eq!(execution.data, json!([1]));

        let requests = transport.recorded();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, TransportMethod::Post);
        assert!(request
            .url
            .starts_with("https://photos.google.com/_/PhotosUi/data/batchexecute?rpcids=abc123"));
        assert_eq!(
            request.header("content-type"),
            Some("application/x-www-form-urlencoded;charset=UTF-8")
        );
        assert_eq!(request.header("cookie"), Some("SID=abc"));
        let body = request.body.as_deref().expect("body");
        assert!(body.starts_with("f.req="));
        assert!(body.ends_with("&at=tok1&"));
    }

    #[tokio::test]
    async fn regression_execute_validation_never_reaches_transport() {
        let transport = ScriptedTransport::with_responses(Vec::new());
        let client = client(transport.clone());

        let mut missing_at = session();
        missing_at.at.clear();
        let cases: Vec<(Vec<CookieItem>, Session, &str, &str)> = vec![
            (Vec::new(), session(), "abc", "cookieJar is required"),
            (jar(), missing_at, "abc", "session fSid/bl/path/at is required"),
            (jar(), Session::default(), "abc", "session fSid/bl/path/at is required"),
            (jar(), session(), "", "rpcid is required"),
        ];
        for (cookie_jar, session, rpcid, expected) in cases {
            let error = client
                .execute(&cookie_jar, session, rpcid, Some(&Value::Null), DEFAULT_SOURCE_PATH)
                .await
                .expect_err("validation");
            assert!(
                matches!(error, RpcError::Validation(ref message) if message == expected),
                "{error}"
            );
        }
        assert!(transport.recorded().is_empty());
    }

    #[tokio::test]
    async fn conformance_execute_auth_statuses_ignore_body() {
        for status in [401_u16, 403] {
            let transport = ScriptedTransport::with_responses(vec![(
                status,
                wrb_body(&json!({"found": true})),
            )]);
            let error = client(transport)
                .execute(&jar(), session(), "op.get", Some(&json!({})), "/")
                .await
                .expect_err("auth");
            assert_eq!(error.kind(), RpcErrorKind::AuthError);
            assert_eq!(error.upstream_status(), Some(status));
        }
    }

    #[tokio::test]
    async fn regression_execute_upstream_error_truncates_body_to_limit() {
        let body = "x".repeat(4_000) + &"y".repeat(1_000);
        let transport = ScriptedTransport::with_responses(vec![(500, body.clone())]);
        let error = client(transport)
            .execute(&jar(), session(), "op.get", Some(&json!({})), "/")
            .await
            .expect_err("upstream");
        assert_eq!(error.kind(), RpcErrorKind::UpstreamError);
        assert_eq!(error.upstream_status(), Some(500));
        assert_eq!(error.details(), Some(body[..3_000].to_string()));
    }

    #[tokio::test]
    async fn functional_execute_error_body_limit_is_configurable() {
        let transport = ScriptedTransport::with_responses(vec![(502, "abcdef".to_string())]);
        let client = RpcClient::new(
            transport,
            RpcClientConfig {
                error_body_limit: 4,
                ..RpcClientConfig::default()
            },
        );
        let error = client
            .execute(&jar(), session(), "op.get", Some(&json!({})), "/")
            .await
            .expect_err("upstream");
        assert_eq!(error.details().as_deref(), Some("abcd"));
    }

    #[tokio::test]
    async fn functional_execute_success_with_garbage_body_is_parse_error() {
        let transport =
            ScriptedTransport::with_responses(vec![(200, "<html>oops</html>".to_string())]);
        let error = client(transport)
            .execute(&jar(), session(), "op.get", Some(&json!({})), "/")
            .await
            .expect_err("parse");
        assert_eq!(error.kind(), RpcErrorKind::ParseError);
    }

    #[tokio::test]
    async fn functional_transport_failure_is_classified_upstream_without_status() {
        let error = client(Arc::new(FailingTransport))
            .execute(&jar(), session(), "op.get", Some(&json!({})), "/")
            .await
            .expect_err("transport");
        assert_eq!(error.kind(), RpcErrorKind::UpstreamError);
        assert_eq!(error.upstream_status(), None);
        assert!(error.message().contains("connection refused"));
    }

    #[tokio::test]
    async fn integration_bootstrap_then_execute_returns_unchanged_session() {
        let page = r#"<script>{"FdrFJe":"fsid123","cfb2h":"bl1","SNlM0e":"tok1"}</script>"#;
        let transport = ScriptedTransport::with_responses(vec![
            (200, page.to_string()),
            (200, wrb_body(&json!({"found": true}))),
        ]);
        let client = client(transport.clone());
        let cookie_jar = jar();

        let session = client
            .bootstrap(&cookie_jar, "/")
            .await
            .expect("bootstrap");
        assert!(session.is_usable());

        let execution = client
            .execute(&cookie_jar, session.clone(), "op.get", Some(&json!({"id": "m1"})), "/")
            .await
            .expect("execute");
        assert_eq!(execution.data, json!({"found": true}));
        assert_eq!(execution.session, session);

        let requests = transport.recorded();
        assert_eq!(requests[0].method, TransportMethod::Get);
        assert_eq!(requests[1].method, TransportMethod::Post);
        assert!(requests[1].url.contains("f.sid=fsid123"));
    }
}
