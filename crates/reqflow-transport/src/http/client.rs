//! `reqwest`-backed transport
//!
//! One attempt is one `reqwest` round trip. The transport never retries and
//! never buffers: the status and headers are returned as soon as they arrive
//! and the body is exposed as a stream for the caller to read or drain.

use crate::body::ResponseBody;
use crate::error::{Result, TransportError};
use crate::traits::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::Duration;

/// Sends requests through a shared, pooled `reqwest::Client`.
///
/// Clones share the connection pool.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    inner: Arc<reqwest::Client>,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// A transport with [`HttpTransportConfig::default`].
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// A transport with explicit connection settings.
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(client),
            config,
        })
    }

    /// Reuse a client configured elsewhere. Its own settings apply.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(client),
            config: HttpTransportConfig::default(),
        }
    }

    /// Settings this transport was built with.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_http(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut outgoing = self
            .inner
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            outgoing = outgoing.body(body.clone());
        }

        tracing::trace!(method = %request.method, path = request.url.path(), "dispatching");
        let response = outgoing.send().await?;

        Ok(HttpResponse {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
            body: ResponseBody::from_stream(response.bytes_stream().map_err(TransportError::from)),
            request: Some(request),
        })
    }
}

/// Connection settings for [`HttpTransport`].
///
/// There is no overall request timeout by default: a call's deadline comes
/// from its `CallContext`, which also covers the waits between attempts.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Per-attempt timeout enforced by `reqwest`, if any
    pub timeout: Option<Duration>,

    /// Time allowed to establish a connection
    pub connect_timeout: Duration,

    /// Idle pooled connections kept per host
    pub pool_max_idle_per_host: usize,

    /// `User-Agent` sent when the request sets none
    pub user_agent: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 10,
            user_agent: Some(concat!("reqflow/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_attempt_timeout() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.config().timeout, None);
        assert_eq!(transport.config().connect_timeout, Duration::from_secs(30));
        assert!(transport.config().user_agent.as_deref().unwrap().starts_with("reqflow/"));
    }

    #[test]
    fn test_custom_config_is_kept() {
        let transport = HttpTransport::with_config(HttpTransportConfig {
            timeout: Some(Duration::from_secs(5)),
            connect_timeout: Duration::from_secs(1),
            pool_max_idle_per_host: 0,
            user_agent: None,
        })
        .unwrap();

        assert_eq!(transport.config().timeout, Some(Duration::from_secs(5)));
        assert_eq!(transport.config().pool_max_idle_per_host, 0);
    }

    #[test]
    fn test_clones_share_pool() {
        let transport = HttpTransport::new().unwrap();
        let clone = transport.clone();
        assert!(Arc::ptr_eq(&transport.inner, &clone.inner));
    }
}
