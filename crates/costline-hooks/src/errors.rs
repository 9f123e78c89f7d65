//! Hook decoding errors.

use thiserror::Error;

/// Errors raised while decoding host payloads.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook action name is not one we handle.
    #[error("unknown hook action: {0}")]
    UnknownAction(String),

    /// The payload is not valid JSON of the expected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Convenience alias for hook results.
pub type Result<T> = std::result::Result<T, HookError>;
