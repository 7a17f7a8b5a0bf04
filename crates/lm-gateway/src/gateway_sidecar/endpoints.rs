//! Shared endpoint and limit constants for the sidecar service.

pub(super) const HEALTH_ENDPOINT: &str = "/health";
pub(super) const SESSION_BOOTSTRAP_ENDPOINT: &str = "/api/session/bootstrap";
pub(super) const RPC_EXECUTE_ENDPOINT: &str = "/api/rpc/execute";
pub(super) const ANY_ORIGIN: &str = "*";
