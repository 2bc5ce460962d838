//! Configuration for the reqflow client

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use reqflow_core::retry::BackoffConfig;
use secrecy::SecretString;

/// Configuration for a [`Client`](crate::Client).
///
/// Everything here can also be set through the client builder; the config
/// form exists for values that come from files or the environment.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Base URL joined to every request address
    pub base_url: Option<String>,

    /// Headers sent with every request
    pub default_headers: HeaderMap,

    /// Bearer token (preferred over basic auth when both are set)
    pub bearer_token: Option<SecretString>,

    /// Basic auth user and password
    pub basic_auth: Option<(String, SecretString)>,

    /// Default backoff policy
    pub backoff: BackoffConfig,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidVar {
        /// Variable name
        var: &'static str,
        /// What was wrong with it
        reason: String,
    },
}

impl ClientConfig {
    /// Start building a configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first, if present.
    /// This will look for:
    /// - `REQFLOW_BASE_URL` for the base URL
    /// - `REQFLOW_BEARER_TOKEN` for bearer authentication
    /// - `REQFLOW_BASIC_USER` and `REQFLOW_BASIC_PASSWORD` for basic authentication
    /// - `REQFLOW_BACKOFF` for the backoff policy, as JSON
    ///   (e.g. `{"strategy":"constant","interval_ms":500,"max_attempts":3}`)
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self, ConfigError> {
        use std::env;

        // A missing .env file is normal
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(base_url) = env::var("REQFLOW_BASE_URL") {
            config.base_url = Some(base_url);
        }

        if let Ok(token) = env::var("REQFLOW_BEARER_TOKEN") {
            config.bearer_token = Some(SecretString::new(token.into_boxed_str()));
        }

        if let Ok(user) = env::var("REQFLOW_BASIC_USER") {
            let pass = env::var("REQFLOW_BASIC_PASSWORD").unwrap_or_default();
            config.basic_auth = Some((user, SecretString::new(pass.into_boxed_str())));
        }

        if let Ok(raw) = env::var("REQFLOW_BACKOFF") {
            config.backoff =
                serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidVar {
                    var: "REQFLOW_BACKOFF",
                    reason: e.to_string(),
                })?;
        }

        Ok(config)
    }

    /// Merge this configuration with another, with the other taking precedence.
    pub fn merge(mut self, other: ClientConfig) -> Self {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        for (key, value) in other.default_headers.iter() {
            self.default_headers.insert(key.clone(), value.clone());
        }
        if other.bearer_token.is_some() {
            self.bearer_token = other.bearer_token;
        }
        if other.basic_auth.is_some() {
            self.basic_auth = other.basic_auth;
        }
        if other.backoff != BackoffConfig::default() {
            self.backoff = other.backoff;
        }

        self
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Add a default header. Invalid names or values are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.config.default_headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "skipping invalid default header"),
        }
        self
    }

    /// Use bearer authentication
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.bearer_token = Some(SecretString::new(token.into().into_boxed_str()));
        self
    }

    /// Use basic authentication
    pub fn basic_auth(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.config.basic_auth = Some((
            user.into(),
            SecretString::new(pass.into().into_boxed_str()),
        ));
        self
    }

    /// Set the backoff policy
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Finish building
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
