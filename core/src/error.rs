//! Error types for the bridge.
//!
//! # Design
//! Each layer owns its error enum so callers can tell the failure classes
//! apart: a buffer that could not grow, a request body over the size
//! ceiling, and a transport that never produced a response. A non-200 status
//! is not an error at this level; it arrives as an ordinary `HttpResponse`.

use std::io;
use std::time::Duration;

/// The response buffer could not grow.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("failed to grow buffer to {requested} bytes")]
    Allocation { requested: usize },
}

/// The assembled request body would not fit under the size ceiling.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("request too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },
}

/// A transport attempt failed before a response record was formed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to send request: {0}")]
    Send(#[source] io::Error),

    #[error("failed to receive response: {0}")]
    Receive(#[source] io::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Error reported by the portable HTTP client library.
    #[error("http client error: {0}")]
    Backend(String),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Errors surfaced to callers of the bridge context and the binding layer.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{name} too long: {len} bytes (limit {limit})")]
    ArgumentTooLong {
        name: &'static str,
        len: usize,
        limit: usize,
    },

    #[error("bridge not initialized")]
    NotInitialized,

    #[error(transparent)]
    RequestTooLarge(#[from] PayloadError),

    #[error("allocation failed: {0}")]
    Allocation(BufferError),

    #[error("transport error: {0}")]
    Transport(TransportError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<BufferError> for BridgeError {
    fn from(err: BufferError) -> Self {
        BridgeError::Allocation(err)
    }
}

impl From<TransportError> for BridgeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Buffer(inner) => BridgeError::Allocation(inner),
            other => BridgeError::Transport(other),
        }
    }
}
