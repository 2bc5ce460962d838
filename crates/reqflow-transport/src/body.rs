//! Single-use response body stream.

use crate::error::{Result, TransportError};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;

/// A response body that can be read exactly once.
///
/// Readers consume the body; after [`ResponseBody::collect`] or
/// [`ResponseBody::drain`] the stream is empty.
pub struct ResponseBody {
    stream: Option<BoxStream<'static, Result<Bytes>>>,
}

impl ResponseBody {
    /// An already-empty body.
    pub fn empty() -> Self {
        Self { stream: None }
    }

    /// A body backed by bytes held in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Self::empty();
        }
        Self::from_stream(stream::once(async move { Ok(bytes) }))
    }

    /// A body backed by a stream of chunks.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            stream: Some(stream.boxed()),
        }
    }

    /// Read the remaining body into memory.
    ///
    /// # Errors
    ///
    /// Returns the first chunk error the stream yields. Bytes read before
    /// the error are discarded.
    pub async fn collect(&mut self) -> Result<Bytes> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(Bytes::new());
        };

        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Read and discard the remaining body, returning how many bytes were
    /// skipped.
    pub async fn drain(&mut self) -> Result<u64> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(0);
        };

        let mut skipped = 0u64;
        while let Some(chunk) = stream.next().await {
            skipped += chunk?.len() as u64;
        }
        Ok(skipped)
    }

    /// Whether the stream has already been consumed.
    pub fn is_consumed(&self) -> bool {
        self.stream.is_none()
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&'static str> for ResponseBody {
    fn from(text: &'static str) -> Self {
        Self::from_bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::from_bytes(text)
    }
}

/// Build a body whose stream fails after yielding `prefix`.
///
/// Used to exercise read-failure handling.
pub fn failing_body(prefix: impl Into<Bytes>, message: impl Into<String>) -> ResponseBody {
    let prefix = prefix.into();
    let message = message.into();
    ResponseBody::from_stream(stream::iter(vec![
        Ok(prefix),
        Err(TransportError::Body(message)),
    ]))
}
