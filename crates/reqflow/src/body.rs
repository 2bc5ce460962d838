//! Buffer-and-replay response bodies
//!
//! A response body arrives as a single-use stream. When more than one party
//! needs it (the error classifier and an error-body decoder, say) the body is
//! read once into a [`ReplayBody`], and each party gets its own
//! [`BodyReader`] over the same bytes.

use bytes::Bytes;
use reqflow_transport::{ResponseBody, TransportError};
use std::borrow::Cow;
use std::io::{self, Read};

/// A fully read response body that can be replayed any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayBody {
    bytes: Bytes,
}

impl ReplayBody {
    /// Wrap bytes already in memory.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Read `body` to the end.
    ///
    /// The source stream is consumed exactly once, however many readers are
    /// later handed out.
    pub async fn read_from(body: &mut ResponseBody) -> Result<Self, TransportError> {
        Ok(Self::new(body.collect().await?))
    }

    /// A fresh reader positioned at the start of the body.
    pub fn reader(&self) -> BodyReader {
        BodyReader {
            inner: io::Cursor::new(self.bytes.clone()),
        }
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// The raw bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Number of bytes buffered
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the body is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An independent reader over a [`ReplayBody`].
#[derive(Debug, Clone)]
pub struct BodyReader {
    inner: io::Cursor<Bytes>,
}

impl BodyReader {
    /// Reader over arbitrary bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: io::Cursor::new(bytes.into()),
        }
    }

    /// Read everything left into a `String`.
    pub fn into_string(mut self) -> io::Result<String> {
        let mut out = String::new();
        self.read_to_string(&mut out)?;
        Ok(out)
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readers_are_independent() {
        let mut source = ResponseBody::from("replay me");
        let body = ReplayBody::read_from(&mut source).await.unwrap();
        assert!(source.is_consumed());

        let mut first = body.reader();
        let mut half = [0u8; 6];
        first.read_exact(&mut half).unwrap();
        assert_eq!(&half, b"replay");

        // A second reader starts from the beginning
        assert_eq!(body.reader().into_string().unwrap(), "replay me");
        assert_eq!(body.text(), "replay me");
        assert_eq!(body.len(), 9);
    }

    #[test]
    fn test_read_failure_is_returned() {
        let mut source = reqflow_transport::body::failing_body("par", "reset by peer");
        let err = tokio_test::block_on(ReplayBody::read_from(&mut source)).unwrap_err();
        assert_eq!(err.to_string(), "Body error: reset by peer");
    }

    #[test]
    fn test_lossy_text() {
        let body = ReplayBody::new(vec![b'o', b'k', 0xff]);
        assert_eq!(body.text(), "ok\u{fffd}");
    }

    #[test]
    fn test_empty() {
        let body = ReplayBody::default();
        assert!(body.is_empty());
        assert_eq!(body.reader().into_string().unwrap(), "");
    }
}
