//! Request and response bodies.

use crate::error::BoxError;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;

/// An HTTP message body.
///
/// `Full` bodies can be read any number of times. `Stream` bodies are
/// one-shot: reading them consumes them.
pub enum Body {
    /// In-memory, replayable bytes.
    Full(Bytes),
    /// One-shot stream of chunks.
    Stream(BoxStream<'static, Result<Bytes, BoxError>>),
}

impl Body {
    /// An empty body.
    pub fn empty() -> Self {
        Body::Full(Bytes::new())
    }

    /// Wrap a chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Body::Stream(stream.boxed())
    }

    /// Whether the body can be read without being consumed.
    pub fn is_replayable(&self) -> bool {
        matches!(self, Body::Full(_))
    }

    /// The bytes of a replayable body, `None` for streams.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Full(bytes) => Some(bytes),
            Body::Stream(_) => None,
        }
    }

    /// Read the whole body into memory.
    pub async fn collect(self) -> Result<Bytes, BoxError> {
        match self.drain().await {
            (bytes, None) => Ok(bytes),
            (_, Some(err)) => Err(err),
        }
    }

    /// Read as much of the body as possible.
    ///
    /// Returns every byte read before the first stream error, plus that error.
    pub async fn drain(self) -> (Bytes, Option<BoxError>) {
        match self {
            Body::Full(bytes) => (bytes, None),
            Body::Stream(mut chunks) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = chunks.next().await {
                    match chunk {
                        Ok(chunk) => buf.extend_from_slice(&chunk),
                        Err(err) => return (buf.freeze(), Some(err)),
                    }
                }
                (buf.freeze(), None)
            }
        }
    }

    /// Rebuild a body from the output of [`Body::drain`].
    ///
    /// Without an error this is a replayable body. With one, readers get the
    /// same bytes and then the same error the original stream produced.
    pub fn replay(bytes: Bytes, err: Option<BoxError>) -> Self {
        match err {
            None => Body::Full(bytes),
            Some(err) => Body::from_stream(stream::iter(vec![Ok(bytes), Err(err)])),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Full(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Full(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Full(Bytes::from_static(text.as_bytes()))
    }
}
