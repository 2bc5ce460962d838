//! Encode/decode boundary
//!
//! The executor knows nothing about wire formats. An [`Encoder`] turns the
//! request body into bytes, a [`Decoder`] turns a successful response body
//! into a value, and an error-body decoder ([`ErrorDecodeFn`]) gets a look at
//! the body of a rejected response. JSON implementations are provided.

use crate::body::BodyReader;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Failure to encode a request body or decode a response body.
///
/// Decode failures on the success path are retried only when the error was
/// built with [`CodecError::retryable`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CodecError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    retryable: bool,
}

impl CodecError {
    /// A non-retryable codec error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            retryable: false,
        }
    }

    /// Wrap an underlying error, keeping its message.
    pub fn from_source<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
            retryable: false,
        }
    }

    /// Mark the error as worth another attempt.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// Whether the error asks for another attempt.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_source(err)
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::from_source(err)
    }
}

/// Turns a request body into bytes.
pub trait Encoder: Send + Sync + fmt::Debug {
    /// Encode `value`.
    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Bytes, CodecError>;

    /// Content type to send alongside encoded bodies, if the encoder has one.
    ///
    /// Applied before request headers, so an explicit `Content-Type` wins.
    fn content_type(&self) -> Option<&'static str> {
        None
    }
}

/// JSON request bodies via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn content_type(&self) -> Option<&'static str> {
        Some("application/json")
    }
}

/// Turns a successful response body into a `T`.
pub trait Decoder<T>: Send + Sync {
    /// Decode the body.
    fn decode(&self, body: BodyReader) -> Result<T, CodecError>;
}

impl<T, F> Decoder<T> for F
where
    F: Fn(BodyReader) -> Result<T, CodecError> + Send + Sync,
{
    fn decode(&self, body: BodyReader) -> Result<T, CodecError> {
        self(body)
    }
}

/// JSON response bodies via `serde_json`.
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    /// Create a JSON decoder for `T`
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonDecoder")
    }
}

impl<T: DeserializeOwned> Decoder<T> for JsonDecoder<T> {
    fn decode(&self, body: BodyReader) -> Result<T, CodecError> {
        Ok(serde_json::from_reader(body)?)
    }
}

/// Shorthand for [`JsonDecoder::new`].
pub fn json<T: DeserializeOwned>() -> JsonDecoder<T> {
    JsonDecoder::new()
}

/// Consumes the body of a rejected response.
///
/// Any error it returns is folded into the request's failure message.
pub type ErrorDecodeFn = Arc<dyn Fn(BodyReader) -> Result<(), CodecError> + Send + Sync>;

/// An error-body decoder that parses JSON into `slot`.
///
/// The slot is left untouched when parsing fails.
///
/// # Examples
///
/// ```rust
/// use reqflow::codec::json_into;
/// use reqflow::body::BodyReader;
/// use std::sync::{Arc, Mutex};
///
/// #[derive(serde::Deserialize, Debug, PartialEq)]
/// struct ApiError {
///     code: u32,
/// }
///
/// let slot = Arc::new(Mutex::new(None));
/// let decode = json_into::<ApiError>(slot.clone());
///
/// decode(BodyReader::from_bytes(r#"{"code":7}"#)).unwrap();
/// assert_eq!(*slot.lock().unwrap(), Some(ApiError { code: 7 }));
/// ```
pub fn json_into<T>(slot: Arc<Mutex<Option<T>>>) -> ErrorDecodeFn
where
    T: DeserializeOwned + Send + 'static,
{
    Arc::new(move |body: BodyReader| {
        let value: T = serde_json::from_reader(body)?;
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn test_json_encoder() {
        let widget = Widget {
            name: "gear".to_string(),
            count: 3,
        };
        let bytes = JsonEncoder.encode(&widget).unwrap();
        assert_eq!(bytes, r#"{"name":"gear","count":3}"#);
        assert_eq!(JsonEncoder.content_type(), Some("application/json"));
    }

    #[test]
    fn test_json_decoder() {
        let decoded: Widget = json::<Widget>()
            .decode(BodyReader::from_bytes(r#"{"name":"gear","count":3}"#))
            .unwrap();
        assert_eq!(decoded.count, 3);
    }

    #[test]
    fn test_decode_failure_is_not_retryable() {
        let err = json::<Widget>().decode(BodyReader::from_bytes("not json")).unwrap_err();
        assert!(!err.is_retryable());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_closure_decoder() {
        let decoder = |body: BodyReader| -> Result<usize, CodecError> {
            Ok(body.into_string()?.len())
        };
        assert_eq!(decoder.decode(BodyReader::from_bytes("four")).unwrap(), 4);
    }

    #[test]
    fn test_retryable_marker() {
        let err = CodecError::new("stream truncated").retryable();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "stream truncated");
    }

    #[test]
    fn test_json_into_leaves_slot_on_failure() {
        let slot: Arc<Mutex<Option<Widget>>> = Arc::new(Mutex::new(None));
        let decode = json_into(slot.clone());
        assert!(decode(BodyReader::from_bytes("{")).is_err());
        assert!(slot.lock().unwrap().is_none());
    }
}
