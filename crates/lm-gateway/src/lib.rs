//! HTTP service boundary for the batched RPC client: health, session
//! bootstrap, and single-call execution endpoints.
pub mod gateway_sidecar;

pub use gateway_sidecar::*;
