//! Error types shared by every transport in the chain.

use thiserror::Error;

/// Boxed error used for body stream failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single round trip.
///
/// Decorators never wrap or rewrite an error coming from the transport they
/// delegate to; it reaches the caller exactly as the inner transport built it.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Error raised by the underlying HTTP client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A body stream failed while being read.
    #[error("body error: {0}")]
    Body(#[source] BoxError),

    /// The request could not be turned into something sendable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Generic failure with no richer cause.
    #[error("{0}")]
    Failed(String),
}

impl TransportError {
    /// Build a generic failure from a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Reasons a request could not be rendered for the log.
///
/// These never abort a request; they are reported on the diagnostic channel.
#[derive(Debug, Error)]
pub enum DumpError {
    /// The body is a one-shot stream and reading it would consume it.
    #[error("request body is a one-shot stream and cannot be dumped")]
    StreamingBody,

    /// The URL has no host to put in the Host line.
    #[error("request URL has no host: {0}")]
    MissingHost(String),
}
