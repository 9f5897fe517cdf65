//! Domain error types

use thiserror::Error;

/// Errors that can occur while controlling fldigi
#[derive(Error, Debug)]
pub enum FldigiError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Remote endpoint error: {0}")]
    Remote(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Supervisor error: {0}")]
    Supervisor(String),

    #[error("Payload error: {0}")]
    Payload(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for fldigi operations
pub type FldigiResult<T> = Result<T, FldigiError>;
