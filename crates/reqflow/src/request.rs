//! Request builder and executor
//!
//! A [`Request`] is the complete, per-call description of an HTTP exchange:
//! where to send it, what to send, how to read the answer, which statuses
//! count as success, and how to back off when an attempt fails. Builder
//! methods consume the request and return the updated one.
//!
//! [`Request::send`] runs the retry loop from `reqflow-core` around a single
//! attempt:
//!
//! 1. encode the body (a body without an encoder is a configuration error)
//! 2. build the wire request: headers, query parameters, then authorization
//! 3. dispatch through the transport, racing the call's cancellation
//! 4. classify the status against the success predicates
//! 5. decode the body, or build a [`ClientError`] from it
//!
//! The response body is read at most once per attempt. When both the error
//! classifier and an error-body decoder need it, they share one buffered copy.

use crate::auth::AuthFn;
use crate::body::ReplayBody;
use crate::codec::{Decoder, Encoder, ErrorDecodeFn, JsonDecoder};
use crate::error::{ClientError, Error, Result};
use crate::observability::{CallMetadata, RequestMetadata, RequestTimer};
use crate::status::{StatusPredicate, matches_any};
use http::Method;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqflow_core::retry::{BackoffFactory, CallContext, retry};
use reqflow_transport::{HttpRequest, HttpResponse, ResponseBody, Transport, TransportError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Rewrites a transport failure before it is classified.
///
/// The second argument is the context of the attempt that failed. Returning
/// an error marked with [`TransportError::into_retryable`] makes the attempt
/// eligible for retry.
pub type ResponseErrorFn =
    Arc<dyn Fn(TransportError, &CallContext) -> TransportError + Send + Sync>;

type Body = Arc<dyn erased_serde::Serialize + Send + Sync>;

/// A declarative HTTP request.
///
/// `T` is the type produced by the success-path decoder; requests without a
/// decoder resolve to `None`.
///
/// A request with no success predicates treats every response as a failure.
///
/// # Examples
///
/// ```rust,no_run
/// use reqflow::prelude::*;
/// use reqflow::status;
///
/// # async fn example(client: Client) -> reqflow::Result<()> {
/// #[derive(serde::Deserialize)]
/// struct Widget {
///     name: String,
/// }
///
/// let widget = client
///     .get("/widgets/7")
///     .query_param("expand", "parts")
///     .success(status::ok())
///     .not_found(status::not_found())
///     .retry_status(status::in_range(500, 599))
///     .decode_json::<Widget>()
///     .send(&CallContext::new())
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Request<T = ()> {
    transport: Arc<dyn Transport>,
    method: Method,
    address: String,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    body: Option<Body>,
    encoder: Option<Arc<dyn Encoder>>,
    decoder: Option<Arc<dyn Decoder<T>>>,
    on_error: Option<ErrorDecodeFn>,
    on_response_error: Option<ResponseErrorFn>,
    auth: Option<AuthFn>,
    success: Vec<StatusPredicate>,
    retry: Vec<StatusPredicate>,
    not_found: Vec<StatusPredicate>,
    exists: Vec<StatusPredicate>,
    backoff: BackoffFactory,
    origin: Option<String>,
}

impl Request<()> {
    /// A request with no encoder, no auth and the never-retry backoff.
    ///
    /// [`Client`](crate::Client) fills in its defaults; use this when
    /// driving a transport directly.
    pub fn new(transport: Arc<dyn Transport>, method: Method, address: impl Into<String>) -> Self {
        Self {
            transport,
            method,
            address: address.into(),
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            encoder: None,
            decoder: None,
            on_error: None,
            on_response_error: None,
            auth: None,
            success: Vec::new(),
            retry: Vec::new(),
            not_found: Vec::new(),
            exists: Vec::new(),
            backoff: BackoffFactory::stop(),
            origin: None,
        }
    }
}

impl<T> Request<T> {
    /// Method of the request
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target address, before query parameters are applied
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Add a header. The last value set for a name wins.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Set the `Content-Type` header.
    pub fn content_type(self, content_type: impl Into<String>) -> Self {
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Add a query parameter. The last value set for a key wins.
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add several query parameters at once.
    ///
    /// `pairs` is read as alternating keys and values; a trailing key with no
    /// value is ignored. Pass `""` as the value to send an empty parameter.
    pub fn query_params(
        self,
        key: impl Into<String>,
        value: impl Into<String>,
        pairs: &[&str],
    ) -> Self {
        pairs
            .chunks_exact(2)
            .fold(self.query_param(key, value), |req, pair| {
                req.query_param(pair[0], pair[1])
            })
    }

    /// Set the request body. It is encoded on every attempt.
    pub fn body<B>(mut self, body: B) -> Self
    where
        B: Serialize + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    /// Set the body encoder, replacing the client's.
    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Decode successful responses with `decoder`.
    pub fn decode<U, D>(self, decoder: D) -> Request<U>
    where
        D: Decoder<U> + 'static,
    {
        Request {
            transport: self.transport,
            method: self.method,
            address: self.address,
            headers: self.headers,
            params: self.params,
            body: self.body,
            encoder: self.encoder,
            decoder: Some(Arc::new(decoder)),
            on_error: self.on_error,
            on_response_error: self.on_response_error,
            auth: self.auth,
            success: self.success,
            retry: self.retry,
            not_found: self.not_found,
            exists: self.exists,
            backoff: self.backoff,
            origin: self.origin,
        }
    }

    /// Decode successful responses as JSON.
    pub fn decode_json<U>(self) -> Request<U>
    where
        U: DeserializeOwned + 'static,
    {
        self.decode(JsonDecoder::<U>::new())
    }

    /// Hand the body of rejected responses to `decode`.
    ///
    /// See [`json_into`](crate::codec::json_into) for the common case.
    pub fn on_error(mut self, decode: ErrorDecodeFn) -> Self {
        self.on_error = Some(decode);
        self
    }

    /// Rewrite transport failures before they are classified.
    pub fn on_response_error<F>(mut self, transform: F) -> Self
    where
        F: Fn(TransportError, &CallContext) -> TransportError + Send + Sync + 'static,
    {
        self.on_response_error = Some(Arc::new(transform));
        self
    }

    /// Set authorization, replacing the client's.
    pub fn auth(mut self, auth: AuthFn) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Add a success predicate.
    pub fn success(mut self, predicate: StatusPredicate) -> Self {
        self.success.push(predicate);
        self
    }

    /// Add a predicate for statuses worth retrying.
    pub fn retry_status(mut self, predicate: StatusPredicate) -> Self {
        self.retry.push(predicate);
        self
    }

    /// Add a predicate for not-found statuses.
    pub fn not_found(mut self, predicate: StatusPredicate) -> Self {
        self.not_found.push(predicate);
        self
    }

    /// Add a predicate for already-exists statuses.
    pub fn exists(mut self, predicate: StatusPredicate) -> Self {
        self.exists.push(predicate);
        self
    }

    /// Set the backoff policy, replacing the client's.
    pub fn backoff(mut self, backoff: BackoffFactory) -> Self {
        self.backoff = backoff;
        self
    }

    /// Label failures from this request.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub(crate) fn with_client_defaults(
        mut self,
        headers: &[(String, String)],
        encoder: Option<Arc<dyn Encoder>>,
        auth: Option<AuthFn>,
        backoff: BackoffFactory,
    ) -> Self {
        self.headers = headers.to_vec();
        self.encoder = encoder;
        self.auth = auth;
        self.backoff = backoff;
        self
    }

    /// Execute the request, retrying as the backoff policy allows.
    ///
    /// Returns `Ok(None)` when no decoder is configured.
    pub async fn send(&self, ctx: &CallContext) -> Result<Option<T>> {
        let timer = RequestTimer::start();
        let mut attempts = 0;

        let result = retry(ctx, &self.backoff, |attempt_ctx| {
            attempts += 1;
            async move {
                let attempt = attempt_ctx.attempt();
                let result = self.execute_attempt(attempt_ctx).await;
                if let Err(err) = &result
                    && err.is_retryable()
                {
                    debug!(attempt, error = %err.summary(), "attempt failed");
                }
                result
            }
        })
        .await;

        let call = CallMetadata::new(attempts, timer.elapsed());
        match &result {
            Ok(_) => call.log_success(&self.method, &self.address),
            Err(err) => call.log_error(&self.method, &self.address, &err.summary()),
        }
        result
    }

    async fn execute_attempt(&self, ctx: CallContext) -> Result<Option<T>> {
        let request = self.build_request()?;

        let mut metadata =
            RequestMetadata::new(request.method.clone(), &request.url, ctx.attempt());
        if let Some(body) = &request.body {
            metadata = metadata.with_body_size(body.len());
        }
        metadata.log_dispatch();

        let dispatched = tokio::select! {
            biased;
            reason = ctx.done() => return Err(Error::Cancelled(reason)),
            result = self.transport.send_http(request.clone()) => result,
        };

        let response = match dispatched {
            Ok(response) => response,
            Err(err) => return Err(self.transport_failure(err, &ctx)),
        };

        metadata.log_status(response.status);
        self.handle_response(response, request).await
    }

    fn build_request(&self) -> Result<HttpRequest> {
        let mut headers = HeaderMap::new();

        let body = match &self.body {
            None => None,
            Some(body) => {
                let encoder = self.encoder.as_ref().ok_or(Error::MissingEncoder)?;
                let encoded = encoder
                    .encode(&**body)
                    .map_err(|err| self.failure().cause(err).build())?;
                if let Some(content_type) = encoder.content_type() {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                }
                Some(encoded)
            }
        };

        let mut url =
            Url::parse(&self.address).map_err(|err| self.failure().cause(err).build())?;
        if !self.params.is_empty() {
            apply_params(&mut url, &self.params);
        }

        for (key, value) in &self.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|err| self.failure().cause(err).build())?;
            let value =
                HeaderValue::from_str(value).map_err(|err| self.failure().cause(err).build())?;
            headers.insert(name, value);
        }

        let mut request = HttpRequest::new(self.method.clone(), url);
        request.headers = headers;
        request.body = body;

        Ok(match &self.auth {
            Some(auth) => auth(request),
            None => request,
        })
    }

    fn transport_failure(&self, err: TransportError, ctx: &CallContext) -> Error {
        let err = match &self.on_response_error {
            Some(transform) => transform(err, ctx),
            None => err,
        };

        self.failure()
            .retry(err.is_retryable())
            .cause(err)
            .build()
            .into()
    }

    async fn handle_response(
        &self,
        mut response: HttpResponse,
        request: HttpRequest,
    ) -> Result<Option<T>> {
        let status = response.status;
        let request = response.request.take().unwrap_or(request);

        if !matches_any(status, &self.success) {
            return Err(self.status_failure(status, &request, &mut response.body).await);
        }

        let Some(decoder) = &self.decoder else {
            release(&mut response.body).await;
            return Ok(None);
        };

        let body = match ReplayBody::read_from(&mut response.body).await {
            Ok(body) => body,
            Err(err) => {
                return Err(self
                    .failure()
                    .response(status, &request)
                    .retry(err.is_retryable())
                    .cause(err)
                    .build()
                    .into());
            }
        };

        decoder.decode(body.reader()).map(Some).map_err(|err| {
            self.failure()
                .response(status, &request)
                .response_body(&body)
                .retry(err.is_retryable())
                .cause(err)
                .build()
                .into()
        })
    }

    async fn status_failure(
        &self,
        status: u16,
        request: &HttpRequest,
        body: &mut ResponseBody,
    ) -> Error {
        let mut failure = self
            .failure()
            .response(status, request)
            .retry(matches_any(status, &self.retry))
            .not_found(matches_any(status, &self.not_found))
            .exists(matches_any(status, &self.exists));

        let body = match ReplayBody::read_from(body).await {
            Ok(body) => body,
            Err(err) => {
                failure = failure.drain_error(err);
                ReplayBody::default()
            }
        };

        if let Some(decode) = &self.on_error
            && let Err(err) = decode(body.reader())
        {
            failure = failure.cause(err);
        }

        failure.response_body(&body).build().into()
    }

    fn failure(&self) -> crate::error::ClientErrorBuilder {
        match &self.origin {
            Some(origin) => ClientError::builder().origin(origin.clone()),
            None => ClientError::builder(),
        }
    }
}

impl<T> Clone for Request<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            method: self.method.clone(),
            address: self.address.clone(),
            headers: self.headers.clone(),
            params: self.params.clone(),
            body: self.body.clone(),
            encoder: self.encoder.clone(),
            decoder: self.decoder.clone(),
            on_error: self.on_error.clone(),
            on_response_error: self.on_response_error.clone(),
            auth: self.auth.clone(),
            success: self.success.clone(),
            retry: self.retry.clone(),
            not_found: self.not_found.clone(),
            exists: self.exists.clone(),
            backoff: self.backoff.clone(),
            origin: self.origin.clone(),
        }
    }
}

impl<T> fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("address", &self.address)
            .field("headers", &self.headers.len())
            .field("params", &self.params.len())
            .field("has_body", &self.body.is_some())
            .field("success", &self.success)
            .field("retry", &self.retry)
            .field("not_found", &self.not_found)
            .field("exists", &self.exists)
            .finish_non_exhaustive()
    }
}

/// Merge `params` into the URL's query, replacing existing values per key.
fn apply_params(url: &mut Url, params: &[(String, String)]) {
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    for (key, value) in params {
        pairs.retain(|(existing, _)| existing != key);
        pairs.push((key.clone(), value.clone()));
    }
    url.query_pairs_mut().clear().extend_pairs(pairs);
}

/// Read and drop whatever is left of the body.
async fn release(body: &mut ResponseBody) {
    if let Err(err) = body.drain().await {
        warn!(error = %err, "failed to drain response body");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqflow_transport::Result as TransportResult;
    use std::sync::Mutex;

    /// Records requests and answers with a fixed status.
    struct Recorder {
        status: u16,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Recorder {
        fn new(status: u16) -> Arc<Self> {
            Arc::new(Self {
                status,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send_http(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(HttpResponse::new(self.status, ResponseBody::empty()))
        }
    }

    fn request(transport: Arc<Recorder>, addr: &str) -> Request {
        Request::new(transport, Method::GET, addr).success(crate::status::ok())
    }

    #[tokio::test]
    async fn test_headers_last_write_wins() {
        let transport = Recorder::new(200);
        request(transport.clone(), "http://svc.test/a")
            .header("X-Mode", "first")
            .header("x-mode", "second")
            .send(&CallContext::new())
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].headers.get_all("x-mode").iter().count(), 1);
        assert_eq!(seen[0].header("x-mode"), Some("second"));
    }

    #[tokio::test]
    async fn test_query_params_merge_with_address() {
        let transport = Recorder::new(200);
        request(transport.clone(), "http://svc.test/a?keep=1&page=1")
            .query_param("page", "2")
            .query_params("sort", "asc", &["limit", "10", "dangling"])
            .send(&CallContext::new())
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].url.query(), Some("keep=1&page=2&sort=asc&limit=10"));
    }

    #[tokio::test]
    async fn test_invalid_address_is_not_retried() {
        let transport = Recorder::new(200);
        let err = request(transport.clone(), "not a url")
            .backoff(BackoffFactory::zero(5))
            .send(&CallContext::new())
            .await
            .unwrap_err();

        assert!(!err.is_retryable());
        assert_eq!(err.status(), 0);
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_header_is_a_client_error() {
        let transport = Recorder::new(200);
        let err = request(transport, "http://svc.test/")
            .header("bad header", "v")
            .send(&CallContext::new())
            .await
            .unwrap_err();
        assert!(err.client_error().is_some());
    }

    #[tokio::test]
    async fn test_origin_label() {
        let err = Request::new(Recorder::new(503), Method::GET, "http://svc.test/")
            .success(crate::status::ok())
            .origin("inventory.lookup")
            .send(&CallContext::new())
            .await
            .unwrap_err();

        assert_eq!(err.client_error().unwrap().origin(), Some("inventory.lookup"));
    }
}
