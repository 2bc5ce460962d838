//! Error types for reqflow
//!
//! Every failed call surfaces as a single [`Error`]. Failures that involved a
//! request carry a [`ClientError`]: a structured record of what was sent, what
//! came back, and three independent flags (retryable, not found, exists)
//! derived from the predicates the request declared.

use crate::body::ReplayBody;
use crate::codec::CodecError;
use http::Method;
use reqflow_core::retry::{CancelError, Retryable};
use reqflow_transport::HttpRequest;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Result type alias for reqflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Query parameters whose values never appear in diagnostics.
const SECRET_PARAMS: [&str; 2] = ["access_token", "secret"];

/// Replacement for redacted values.
pub const REDACTED: &str = "REDACTED";

const DEFAULT_MESSAGE: &str = "received unexpected response";

/// Secrets shorter than this are redacted from URLs but not searched for in
/// free text, where they would match unrelated words and numbers.
const MIN_SCRUB_LEN: usize = 3;

/// Main error type for reqflow.
#[derive(Debug, Error)]
pub enum Error {
    /// A body was set but no encoder is configured.
    #[error("no encode fn provided for body")]
    MissingEncoder,

    /// A request failed and was classified.
    #[error(transparent)]
    Client(Box<ClientError>),

    /// The call's context was cancelled or its deadline passed.
    #[error(transparent)]
    Cancelled(#[from] CancelError),
}

impl Error {
    /// Whether the failure may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Client(err) if err.is_retryable())
    }

    /// Whether the response matched a not-found predicate.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Client(err) if err.is_not_found())
    }

    /// Whether the response matched an exists predicate.
    pub fn is_exists(&self) -> bool {
        matches!(self, Error::Client(err) if err.is_exists())
    }

    /// The classified failure, if there is one.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Error::Client(err) => Some(err),
            _ => None,
        }
    }

    /// The response status, or 0 when no response was received.
    pub fn status(&self) -> u16 {
        self.client_error().map_or(0, ClientError::status)
    }

    /// A condensed message suitable for per-retry logging.
    pub fn summary(&self) -> String {
        match self {
            Error::Client(err) => err.summary(),
            other => other.to_string(),
        }
    }
}

impl From<ClientError> for Error {
    fn from(err: ClientError) -> Self {
        Error::Client(Box::new(err))
    }
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        let retry = err.is_retryable();
        ClientError::builder().retry(retry).cause(err).build().into()
    }
}

impl Retryable for Error {
    fn is_retryable(&self) -> bool {
        Error::is_retryable(self)
    }
}

/// A classified request failure.
///
/// Built once per failed attempt with [`ClientError::builder`] and immutable
/// afterwards. URL secrets are redacted at construction.
#[derive(Debug)]
pub struct ClientError {
    status: u16,
    method: Option<Method>,
    url: Option<Url>,
    message: String,
    response_body: String,
    request_body: String,
    drain_error: Option<String>,
    origin: Option<String>,
    retry: bool,
    not_found: bool,
    exists: bool,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ClientError {
    /// Start building a classified failure.
    pub fn builder() -> ClientErrorBuilder {
        ClientErrorBuilder::default()
    }

    /// Response status, 0 when there was no response.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Request method, when a request was made.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Request URL with secrets redacted.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Error text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Response body text, empty if there was none.
    pub fn response_body(&self) -> &str {
        &self.response_body
    }

    /// Request body text. Only JSON request bodies are captured.
    pub fn request_body(&self) -> &str {
        &self.request_body
    }

    /// What went wrong releasing the response body, if anything.
    pub fn drain_error(&self) -> Option<&str> {
        self.drain_error.as_deref()
    }

    /// Label of the operation that produced the failure.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Whether the failure may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        self.retry
    }

    /// Whether the response matched a not-found predicate.
    pub fn is_not_found(&self) -> bool {
        self.not_found
    }

    /// Whether the response matched an exists predicate.
    pub fn is_exists(&self) -> bool {
        self.exists
    }

    /// Status, method and URL only.
    pub fn summary(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if self.status != 0 {
            parts.push(format!("status={}", self.status));
        }
        if let Some(method) = &self.method {
            parts.push(format!("method={}", method));
        }
        if let Some(url) = &self.url {
            parts.push(format!("url={:?}", url.as_str()));
        }
        parts.join(" ")
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(5);
        let base = self.summary();
        if !base.is_empty() {
            parts.push(base);
        }
        if !self.message.is_empty() {
            parts.push(format!("err={:?}", self.message));
        }
        if !self.response_body.is_empty() {
            parts.push(format!("response_body={:?}", self.response_body));
        }
        if !self.request_body.is_empty() {
            parts.push(format!("request_body={:?}", self.request_body));
        }
        if let Some(drain) = &self.drain_error {
            parts.push(format!("drain_err={:?}", drain));
        }
        f.write_str(&parts.join(" "))
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Builder for [`ClientError`].
///
/// Each contribution is independent; anything not supplied stays at its
/// zero value.
#[derive(Debug, Default)]
pub struct ClientErrorBuilder {
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    status: u16,
    request: Option<HttpRequest>,
    response_body: Option<ReplayBody>,
    drain_error: Option<String>,
    origin: Option<String>,
    retry: bool,
    not_found: bool,
    exists: bool,
}

impl ClientErrorBuilder {
    /// The underlying error. Its message replaces the default one.
    pub fn cause<E>(mut self, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(err));
        self
    }

    /// The response status and the request that produced it.
    pub fn response(mut self, status: u16, request: &HttpRequest) -> Self {
        self.status = status;
        self.request = Some(request.clone());
        self
    }

    /// The buffered response body.
    pub fn response_body(mut self, body: &ReplayBody) -> Self {
        self.response_body = Some(body.clone());
        self
    }

    /// A failure reading or releasing the response body.
    pub fn drain_error(mut self, err: impl fmt::Display) -> Self {
        self.drain_error = Some(err.to_string());
        self
    }

    /// Mark as retryable.
    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    /// Mark as not found.
    pub fn not_found(mut self, not_found: bool) -> Self {
        self.not_found = not_found;
        self
    }

    /// Mark as already existing.
    pub fn exists(mut self, exists: bool) -> Self {
        self.exists = exists;
        self
    }

    /// Label the operation that failed.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Assemble the failure, redacting secrets along the way.
    pub fn build(self) -> ClientError {
        let mut message = match &self.cause {
            Some(cause) => cause.to_string(),
            None => DEFAULT_MESSAGE.to_string(),
        };

        let mut method = None;
        let mut url = None;
        let mut request_body = String::new();

        if let Some(request) = self.request {
            let (redacted, secrets) = redact(&request.url);
            for secret in &secrets {
                message = scrub(&message, secret);
            }
            if is_json(&request)
                && let Some(body) = &request.body
            {
                request_body = String::from_utf8_lossy(body).into_owned();
            }
            method = Some(request.method);
            url = Some(redacted);
        }

        ClientError {
            status: self.status,
            method,
            url,
            message,
            response_body: self
                .response_body
                .map(|body| body.text().into_owned())
                .unwrap_or_default(),
            request_body,
            drain_error: self.drain_error,
            origin: self.origin,
            retry: self.retry,
            not_found: self.not_found,
            exists: self.exists,
            source: self.cause,
        }
    }
}

fn is_json(request: &HttpRequest) -> bool {
    request
        .header(http::header::CONTENT_TYPE.as_str())
        .is_some_and(|ct| ct.contains("application/json"))
}

/// `message` with every spelling of `secret` replaced: as decoded, as
/// form-urlencoded, and as it appeared in the raw query string.
fn scrub(message: &str, secret: &str) -> String {
    if secret.chars().count() < MIN_SCRUB_LEN {
        return message.to_string();
    }
    let encoded: String = url::form_urlencoded::byte_serialize(secret.as_bytes()).collect();
    let mut scrubbed = message.replace(secret, REDACTED);
    if encoded != secret {
        scrubbed = scrubbed.replace(&encoded, REDACTED);
    }
    scrubbed
}

/// Copy of `url` with secret query values replaced, plus the values removed.
///
/// The removed values include both the decoded form and the spelling used in
/// the raw query string.
pub(crate) fn redact(url: &Url) -> (Url, Vec<String>) {
    let mut secrets: Vec<String> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, value)| SECRET_PARAMS.contains(key) && !value.is_empty())
        .map(|(_, value)| value.to_string())
        .collect();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            if SECRET_PARAMS.contains(&key.as_ref()) && !value.is_empty() {
                if !secrets.iter().any(|seen| *seen == value) {
                    secrets.push(value.to_string());
                }
                (key.into_owned(), REDACTED.to_string())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();

    if secrets.is_empty() {
        return (url.clone(), secrets);
    }

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    (redacted, secrets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::{CONTENT_TYPE, HeaderValue};
    use pretty_assertions::assert_eq;

    fn request(url: &str) -> HttpRequest {
        HttpRequest::new(Method::GET, Url::parse(url).unwrap())
    }

    #[test]
    fn test_default_message_without_response() {
        let err = ClientError::builder().build();
        assert_eq!(err.status(), 0);
        assert!(err.method().is_none());
        assert_eq!(err.to_string(), r#"err="received unexpected response""#);
    }

    #[test]
    fn test_cause_replaces_message() {
        let err = ClientError::builder()
            .cause(std::io::Error::other("boom"))
            .build();
        assert_eq!(err.message(), "boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_message_composition_order() {
        let mut req = request("http://api.test/things?id=1");
        req.method = Method::POST;
        let req = req
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(Bytes::from_static(br#"{"a":1}"#));

        let err = ClientError::builder()
            .response(500, &req)
            .response_body(&ReplayBody::new("oops"))
            .build();

        assert_eq!(
            err.to_string(),
            r#"status=500 method=POST url="http://api.test/things?id=1" err="received unexpected response" response_body="oops" request_body="{\"a\":1}""#
        );
        assert_eq!(err.summary(), r#"status=500 method=POST url="http://api.test/things?id=1""#);
    }

    #[test]
    fn test_non_json_request_body_not_captured() {
        let req = request("http://api.test/")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_body("hello");
        let err = ClientError::builder().response(400, &req).build();
        assert_eq!(err.request_body(), "");
    }

    #[test]
    fn test_secrets_are_redacted() {
        let req = request("http://api.test/x?access_token=XYZ&secret=shh&page=2");
        let err = ClientError::builder()
            .cause(std::io::Error::other("GET http://api.test/x?access_token=XYZ failed"))
            .response(401, &req)
            .build();

        let text = err.to_string();
        assert!(!text.contains("XYZ"));
        assert!(!text.contains("shh"));
        assert!(text.contains("access_token=REDACTED"));
        assert!(text.contains("secret=REDACTED"));
        assert!(text.contains("page=2"));
    }

    #[test]
    fn test_encoded_secret_scrubbed_from_message() {
        let req = request("http://api.test/x?access_token=a%2Fb%2Bc&secret=p+q+r");
        let err = ClientError::builder()
            .cause(std::io::Error::other(
                "GET /x?access_token=a%2Fb%2Bc&secret=p+q+r (token a/b+c, secret p q r)",
            ))
            .response(401, &req)
            .build();

        let message = err.message();
        assert!(!message.contains("a%2Fb%2Bc"), "{}", message);
        assert!(!message.contains("a/b+c"), "{}", message);
        assert!(!message.contains("p+q+r"), "{}", message);
        assert!(!message.contains("p q r"), "{}", message);
    }

    #[test]
    fn test_short_secret_not_scrubbed_from_message() {
        let req = request("http://api.test/x?secret=1");
        let err = ClientError::builder()
            .cause(std::io::Error::other("status 401 from upstream"))
            .response(401, &req)
            .build();

        assert_eq!(err.message(), "status 401 from upstream");
        assert!(err.to_string().contains("secret=REDACTED"));
    }

    #[test]
    fn test_empty_secret_left_alone() {
        let (url, secrets) = redact(&Url::parse("http://api.test/?secret=").unwrap());
        assert!(secrets.is_empty());
        assert_eq!(url.as_str(), "http://api.test/?secret=");
    }

    #[test]
    fn test_flags_are_independent() {
        let err = ClientError::builder()
            .retry(true)
            .not_found(true)
            .exists(true)
            .build();
        assert!(err.is_retryable() && err.is_not_found() && err.is_exists());

        let err = ClientError::builder().not_found(true).build();
        assert!(!err.is_retryable());
        assert!(err.is_not_found());
        assert!(!err.is_exists());
    }

    #[test]
    fn test_drain_error_is_reported() {
        let err = ClientError::builder().drain_error("connection reset").build();
        assert!(err.to_string().ends_with(r#"drain_err="connection reset""#));
    }

    #[test]
    fn test_error_flag_queries() {
        let err: Error = ClientError::builder().retry(true).exists(true).build().into();
        assert!(err.is_retryable());
        assert!(err.is_exists());
        assert!(!err.is_not_found());

        assert!(!Error::MissingEncoder.is_retryable());
        assert!(!Error::from(CancelError::Cancelled).is_retryable());
        assert_eq!(Error::MissingEncoder.to_string(), "no encode fn provided for body");
    }

    #[test]
    fn test_codec_error_conversion_keeps_retry_signal() {
        let err: Error = CodecError::new("truncated").retryable().into();
        assert!(err.is_retryable());
        let err: Error = CodecError::new("garbage").into();
        assert!(!err.is_retryable());
    }
}
