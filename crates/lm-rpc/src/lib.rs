//! Client for the batched web RPC transport: session bootstrap, wire envelope
//! codec, and classified single-call execution.
pub mod bootstrap;
mod client;
pub mod cookies;
pub mod envelope;
mod transport;
mod types;

pub use bootstrap::{
    extract_session, SessionBootstrapper, SessionField, SessionTokenField, DEFAULT_SESSION_PATH,
    SESSION_TOKEN_FIELDS,
};
pub use client::{
    RpcClient, RpcClientConfig, DEFAULT_ERROR_BODY_LIMIT, DEFAULT_SOURCE_PATH,
    DEFAULT_UPSTREAM_ORIGIN,
};
pub use cookies::{cookie_header, load_cookie_jar, parse_cookie_string, parse_netscape_cookie_file};
pub use envelope::{EncodedRpcRequest, RpcEnvelopeCodec};
pub use transport::{ReqwestTransport, ReqwestTransportConfig, DEFAULT_REQUEST_TIMEOUT_MS};
pub use types::{
    CookieItem, RpcError, RpcErrorKind, RpcExecution, RpcTransport, Session, TransportError,
    TransportMethod, TransportRequest, TransportResponse,
};
