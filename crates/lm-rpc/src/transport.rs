use async_trait::async_trait;

use crate::{RpcTransport, TransportError, TransportMethod, TransportRequest, TransportResponse};

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;

#[derive(Debug, Clone)]
/// Public struct `ReqwestTransportConfig` used across the sidecar crates.
pub struct ReqwestTransportConfig {
    pub request_timeout_ms: u64,
}

impl Default for ReqwestTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone)]
/// HTTP transport backed by a shared `reqwest::Client`; follows redirects.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: ReqwestTransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RpcTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = match request.method {
            TransportMethod::Get => self.client.get(&request.url),
            TransportMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}
