//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur in transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout")]
    Timeout,

    /// Reading the response body failed
    #[error("Body error: {0}")]
    Body(String),

    /// Generic transport error
    #[error("{0}")]
    Other(String),

    /// An error explicitly marked as worth another attempt
    #[error(transparent)]
    Retryable(Box<TransportError>),
}

impl TransportError {
    /// Mark this error as retryable.
    ///
    /// Marking twice has no further effect.
    pub fn into_retryable(self) -> Self {
        match self {
            retryable @ TransportError::Retryable(_) => retryable,
            other => TransportError::Retryable(Box::new(other)),
        }
    }

    /// Whether the error carries the retryable marker.
    ///
    /// Transport failures are not retried unless the transport, or a
    /// caller-supplied transform, says so.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Retryable(_))
    }

    /// The error with any retryable marker removed.
    pub fn inner(&self) -> &TransportError {
        match self {
            TransportError::Retryable(inner) => inner.inner(),
            other => other,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // The URL may carry credentials in its query string.
        let err = err.without_url();
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}
