//! Authorization decorators
//!
//! An [`AuthFn`] receives the fully built outgoing request and returns it
//! with credentials applied. It runs after headers and query parameters.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::header::{AUTHORIZATION, HeaderValue};
use reqflow_transport::HttpRequest;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Decorates an outgoing request with credentials.
pub type AuthFn = Arc<dyn Fn(HttpRequest) -> HttpRequest + Send + Sync>;

/// HTTP basic authentication.
///
/// # Examples
///
/// ```rust
/// use reqflow::auth::basic_auth;
/// use reqflow_transport::HttpRequest;
///
/// let auth = basic_auth("aladdin", "opensesame");
/// let request = HttpRequest::new(http::Method::GET, "http://localhost/".parse().unwrap());
/// let request = auth(request);
///
/// assert_eq!(
///     request.header("authorization"),
///     Some("Basic YWxhZGRpbjpvcGVuc2VzYW1l"),
/// );
/// ```
pub fn basic_auth(user: impl Into<String>, pass: impl Into<String>) -> AuthFn {
    let user = user.into();
    let pass = SecretString::new(pass.into().into_boxed_str());

    Arc::new(move |request: HttpRequest| {
        let encoded = STANDARD.encode(format!("{}:{}", user, pass.expose_secret()));
        set_authorization(request, format!("Basic {}", encoded))
    })
}

/// Bearer token authentication.
pub fn bearer_token(token: impl Into<String>) -> AuthFn {
    bearer_secret(SecretString::new(token.into().into_boxed_str()))
}

/// Bearer token authentication from an already protected token.
pub fn bearer_secret(token: SecretString) -> AuthFn {
    Arc::new(move |request: HttpRequest| {
        set_authorization(request, format!("Bearer {}", token.expose_secret()))
    })
}

fn set_authorization(mut request: HttpRequest, value: String) -> HttpRequest {
    match HeaderValue::try_from(value) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        }
        Err(_) => {
            tracing::warn!("credentials are not a valid header value, request sent without them");
        }
    }
    request
}
