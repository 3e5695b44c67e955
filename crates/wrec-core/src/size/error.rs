//! Size fetch error type.

use thiserror::Error;

/// Why a single size fetch produced no update. Every variant is recoverable:
/// the poll loop logs it and tries again at the next tick.
#[derive(Debug, Error)]
pub enum SizeFetchError {
    /// Curl reported an error (timeout, connection refused, DNS, etc.).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    /// Response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Body was not a JSON object with an optional integer `size`.
    #[error("malformed size payload: {0}")]
    Payload(#[from] serde_json::Error),
    /// The session id could not be placed into the endpoint URL.
    #[error("invalid size endpoint: {0}")]
    Endpoint(String),
    /// The blocking fetch task panicked or was cancelled.
    #[error("size fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
