//! Centralized observability utilities for structured logging
//!
//! Every dispatch, response and finished call is logged through this layer,
//! so field names stay consistent. URLs are redacted before they are logged.

use crate::error::redact;
use http::Method;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Request metadata for structured logging
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// HTTP method
    pub method: Method,
    /// Request URL, secrets redacted
    pub url: String,
    /// 0-based attempt number
    pub attempt: u32,
    /// Request body size in bytes (optional)
    pub body_size: Option<usize>,
}

impl RequestMetadata {
    /// Create new request metadata, redacting the URL.
    pub fn new(method: Method, url: &Url, attempt: u32) -> Self {
        Self {
            method,
            url: redact(url).0.to_string(),
            attempt,
            body_size: None,
        }
    }

    /// Set the request body size
    pub fn with_body_size(mut self, size: usize) -> Self {
        self.body_size = Some(size);
        self
    }

    /// Log request being sent
    pub fn log_dispatch(&self) {
        debug!(
            method = %self.method,
            url = %self.url,
            attempt = self.attempt,
            body_size = self.body_size,
            "Sending HTTP request"
        );
    }

    /// Log a received status
    pub fn log_status(&self, status: u16) {
        debug!(
            method = %self.method,
            url = %self.url,
            attempt = self.attempt,
            status,
            "Received HTTP response"
        );
    }
}

/// Outcome of a whole call, across all attempts
#[derive(Debug, Clone)]
pub struct CallMetadata {
    /// Attempts made
    pub attempts: u32,
    /// Time elapsed for the call
    pub elapsed: Duration,
}

impl CallMetadata {
    /// Create new call metadata
    pub fn new(attempts: u32, elapsed: Duration) -> Self {
        Self { attempts, elapsed }
    }

    /// Log successful call
    pub fn log_success(&self, method: &Method, address: &str) {
        info!(
            method = %method,
            address = %redacted_address(address),
            attempts = self.attempts,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "HTTP call succeeded"
        );
    }

    /// Log failed call
    pub fn log_error(&self, method: &Method, address: &str, error: &str) {
        warn!(
            method = %method,
            address = %redacted_address(address),
            attempts = self.attempts,
            elapsed_ms = self.elapsed.as_millis() as u64,
            error = %error,
            "HTTP call failed"
        );
    }
}

/// `address` with URL secrets redacted. Unparseable addresses are not logged.
pub fn redacted_address(address: &str) -> String {
    match Url::parse(address) {
        Ok(url) => redact(&url).0.to_string(),
        Err(_) => "<invalid address>".to_string(),
    }
}

/// Timer for measuring call duration
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Install a `tracing-subscriber` formatter filtered by `RUST_LOG`.
///
/// Falls back to `reqflow=info` when `RUST_LOG` is unset. Calling it more
/// than once is harmless; later calls leave the first subscriber in place.
#[cfg(feature = "trace")]
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reqflow=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metadata_redacts_url() {
        let url = Url::parse("http://svc.test/items?access_token=abc&page=3").unwrap();
        let metadata = RequestMetadata::new(Method::GET, &url, 2);
        assert_eq!(metadata.url, "http://svc.test/items?access_token=REDACTED&page=3");
        assert_eq!(metadata.attempt, 2);
        assert_eq!(metadata.body_size, None);
    }

    #[test]
    fn test_request_metadata_with_body_size() {
        let url = Url::parse("http://svc.test/").unwrap();
        let metadata = RequestMetadata::new(Method::POST, &url, 0).with_body_size(1024);
        assert_eq!(metadata.body_size, Some(1024));
    }

    #[test]
    fn test_call_metadata() {
        let metadata = CallMetadata::new(3, Duration::from_millis(40));
        assert_eq!(metadata.attempts, 3);
        metadata.log_success(&Method::GET, "http://svc.test/");
        metadata.log_error(&Method::GET, "http://svc.test/", "boom");
    }

    #[test]
    fn test_redacted_address() {
        assert_eq!(
            redacted_address("https://svc.test/a?secret=s3"),
            "https://svc.test/a?secret=REDACTED"
        );
        assert_eq!(redacted_address("relative/path?secret=s3"), "<invalid address>");
    }

    #[test]
    fn test_request_timer() {
        let timer = RequestTimer::start();
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed().as_millis() >= 10);
    }
}
