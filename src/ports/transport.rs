//! RPC transport port trait

use crate::domain::FldigiResult;

/// Carries one encoded request body to the endpoint and returns the
/// response body. Framing (HTTP, headers) belongs to the implementation.
///
/// Only requires `Send` (not `Sync`): always owned by a single session.
pub trait RpcTransport: Send {
    /// Send a request body and return the raw response body
    fn post(&mut self, body: &str) -> FldigiResult<String>;

    /// Human-readable endpoint address, for logs
    fn endpoint(&self) -> String;
}
