//! Client factory
//!
//! A [`Client`] holds the defaults shared by every request it creates: the
//! transport, a base URL, headers, authorization, the body encoder and the
//! backoff policy. Each request can override any of them.

use std::sync::Arc;

use http::Method;
use http::header::CONTENT_TYPE;
use reqflow_core::retry::BackoffFactory;
use reqflow_transport::Transport;

use crate::{
    auth::{self, AuthFn},
    codec::{Encoder, JsonEncoder},
    config::ClientConfig,
    request::Request,
};

/// Creates requests that share a transport and a set of defaults.
///
/// Cloning is cheap; clones share the same defaults.
///
/// # Example
///
/// ```rust,no_run
/// use reqflow::Client;
/// use reqflow_transport::HttpTransport;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::builder(HttpTransport::new()?)
///     .base_url("https://api.example.com/v1")
///     .header("User-Agent", "inventory-sync")
///     .build();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    base_url: String,
    headers: Vec<(String, String)>,
    auth: Option<AuthFn>,
    encoder: Option<Arc<dyn Encoder>>,
    backoff: BackoffFactory,
}

impl Client {
    /// A client with a JSON encoder, no retries, and no base URL.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::builder(transport).build()
    }

    /// Start configuring a client.
    pub fn builder(transport: impl Transport + 'static) -> ClientBuilder {
        ClientBuilder::new(Arc::new(transport))
    }

    /// Create a client from a configuration object.
    pub fn from_config(transport: impl Transport + 'static, config: ClientConfig) -> Self {
        let mut builder = Self::builder(transport).backoff(config.backoff.factory());

        if let Some(base_url) = config.base_url {
            builder = builder.base_url(base_url);
        }
        for (name, value) in &config.default_headers {
            if let Ok(value) = value.to_str() {
                builder = builder.header(name.as_str(), value);
            }
        }
        if let Some(token) = config.bearer_token {
            builder = builder.auth(auth::bearer_secret(token));
        } else if let Some((user, pass)) = config.basic_auth {
            use secrecy::ExposeSecret;
            builder = builder.auth(auth::basic_auth(user, pass.expose_secret()));
        }

        builder.build()
    }

    /// The base URL every request address is joined to.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// GET request
    pub fn get(&self, addr: &str) -> Request {
        self.request(Method::GET, addr)
    }

    /// POST request
    pub fn post(&self, addr: &str) -> Request {
        self.request(Method::POST, addr)
    }

    /// PUT request
    pub fn put(&self, addr: &str) -> Request {
        self.request(Method::PUT, addr)
    }

    /// PATCH request
    pub fn patch(&self, addr: &str) -> Request {
        self.request(Method::PATCH, addr)
    }

    /// DELETE request
    pub fn delete(&self, addr: &str) -> Request {
        self.request(Method::DELETE, addr)
    }

    /// HEAD request
    pub fn head(&self, addr: &str) -> Request {
        self.request(Method::HEAD, addr)
    }

    /// A request with any method, carrying the client's defaults.
    pub fn request(&self, method: Method, addr: &str) -> Request {
        let inner = &self.inner;
        Request::new(inner.transport.clone(), method, join(&inner.base_url, addr))
            .with_client_defaults(
                &inner.headers,
                inner.encoder.clone(),
                inner.auth.clone(),
                inner.backoff.clone(),
            )
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("headers", &self.inner.headers.len())
            .field("auth", &self.inner.auth.is_some())
            .field("encoder", &self.inner.encoder)
            .field("backoff", &self.inner.backoff)
            .finish()
    }
}

/// Joins a base URL and a request address with exactly the slash the two
/// are missing.
fn join(base: &str, addr: &str) -> String {
    if base.is_empty() {
        return addr.to_string();
    }
    if base.ends_with('/') || addr.starts_with('/') {
        format!("{}{}", base, addr)
    } else {
        format!("{}/{}", base, addr)
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    base_url: String,
    headers: Vec<(String, String)>,
    auth: Option<AuthFn>,
    encoder: Option<Arc<dyn Encoder>>,
    backoff: BackoffFactory,
}

impl ClientBuilder {
    fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: String::new(),
            headers: Vec::new(),
            auth: None,
            encoder: Some(Arc::new(JsonEncoder)),
            backoff: BackoffFactory::stop(),
        }
    }

    /// Prefix for every request address.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// A header sent with every request. Request headers of the same name win.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// A `Content-Type` sent with every request.
    pub fn content_type(self, content_type: impl Into<String>) -> Self {
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Default authorization.
    pub fn auth(mut self, auth: AuthFn) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Default body encoder.
    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Build requests without a default encoder; bodies then need a
    /// per-request one.
    pub fn without_encoder(mut self) -> Self {
        self.encoder = None;
        self
    }

    /// Default backoff policy.
    pub fn backoff(mut self, backoff: BackoffFactory) -> Self {
        self.backoff = backoff;
        self
    }

    /// Finish configuring.
    pub fn build(self) -> Client {
        Client {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                base_url: self.base_url,
                headers: self.headers,
                auth: self.auth,
                encoder: self.encoder,
                backoff: self.backoff,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://svc.test", "widgets", "http://svc.test/widgets")]
    #[case("http://svc.test", "/widgets", "http://svc.test/widgets")]
    #[case("http://svc.test/", "widgets", "http://svc.test/widgets")]
    #[case("", "http://other.test/x", "http://other.test/x")]
    fn test_join(#[case] base: &str, #[case] addr: &str, #[case] expected: &str) {
        assert_eq!(join(base, addr), expected);
    }
}
