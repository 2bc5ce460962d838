//! Transport trait and request/response types
//!
//! Defines the generic Transport trait consumed by the request executor.
//! Anything that can turn an [`HttpRequest`] into an [`HttpResponse`] can
//! stand in for the network, which is how tests drive the executor.

use crate::body::ResponseBody;
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use std::sync::Arc;
use url::Url;

/// An outgoing HTTP request
///
/// Represents an HTTP request to be sent via the Transport. The body is held
/// in memory so the request can be cloned and re-sent on every attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,

    /// Request URL, query string included
    pub url: Url,

    /// Request headers
    pub headers: HeaderMap,

    /// Request body (optional)
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a new HTTP request
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Set a header, replacing any existing value for the same name
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the request body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Get a header value as text, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// HTTP response
///
/// Represents an HTTP response received from the server. The body is a
/// single-use stream; whoever reads it owns the bytes.
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body
    pub body: ResponseBody,

    /// The request that produced this response, when the transport keeps it
    pub request: Option<HttpRequest>,
}

impl HttpResponse {
    /// Create a new HTTP response
    pub fn new(status: u16, body: impl Into<ResponseBody>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            request: None,
        }
    }

    /// Set a header, replacing any existing value for the same name
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach the originating request
    pub fn with_request(mut self, request: HttpRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value as text (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Generic transport trait
///
/// Implementations must not retry on their own; retry decisions belong to
/// the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an HTTP request and receive a response
    ///
    /// Any status code is a successful exchange. An `Err` means no response
    /// was obtained.
    async fn send_http(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_http(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send_http(request).await
    }
}
