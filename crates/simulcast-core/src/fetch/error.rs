//! Remote fetch error types

use thiserror::Error;

/// Errors that can occur while fetching the next batch of turns
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport failure (DNS, connect, timeout, truncated body)
    #[error("Request to turn endpoint failed: {0}")]
    Http(String),

    /// The endpoint answered with a non-success status
    #[error("Turn endpoint returned HTTP {code}")]
    Status { code: u16 },

    /// The body is not the expected JSON
    #[error("Failed to decode endpoint response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The JSON parsed but a turn has an unexpected shape
    #[error("Malformed turn batch: {0}")]
    Malformed(String),

    /// The fetch worker is no longer running
    #[error("Fetch worker disconnected")]
    Disconnected,
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;
