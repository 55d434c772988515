//! Response content inputs and their coercion into bytes.
//!
//! [`Content`] is what application code hands to a response: text, binary,
//! or a lazy producer of byte chunks. [`to_bytes`] turns the materialized
//! variants into [`Bytes`] without copying where the input already owns its
//! buffer.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use futures::Stream;
use futures::stream::BoxStream;

use crate::protocol::ContentError;

/// A lazy, synchronous producer of body chunks.
pub type BodyIter = Box<dyn Iterator<Item = Bytes> + Send>;

/// A lazy, asynchronous producer of body chunks.
pub type BodyStream = BoxStream<'static, Bytes>;

/// Content accepted by a response before it becomes a body unit.
pub enum Content {
    /// Text, always encoded as UTF-8
    Text(Cow<'static, str>),
    /// Already materialized bytes
    Binary(Bytes),
    /// Chunks pulled synchronously when the response is streamed
    Iterator(BodyIter),
    /// Chunks polled asynchronously when the response is streamed
    AsyncIterator(BodyStream),
}

impl Content {
    /// Wraps a synchronous chunk producer.
    pub fn iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        Self::Iterator(Box::new(iter.into_iter()))
    }

    /// Wraps an asynchronous chunk producer.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Bytes> + Send + 'static,
    {
        Self::AsyncIterator(Box::pin(stream))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Binary(_) => "binary",
            Content::Iterator(_) => "iterator",
            Content::AsyncIterator(_) => "async iterator",
        }
    }

    #[inline]
    pub fn is_materialized(&self) -> bool {
        matches!(self, Content::Text(_) | Content::Binary(_))
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Content::Binary(bytes) => f.debug_tuple("Binary").field(bytes).finish(),
            Content::Iterator(_) => f.write_str("Iterator(..)"),
            Content::AsyncIterator(_) => f.write_str("AsyncIterator(..)"),
        }
    }
}

impl From<&'static str> for Content {
    fn from(value: &'static str) -> Self {
        Content::Text(Cow::Borrowed(value))
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(Cow::Owned(value))
    }
}

impl From<Cow<'static, str>> for Content {
    fn from(value: Cow<'static, str>) -> Self {
        Content::Text(value)
    }
}

impl From<Bytes> for Content {
    fn from(value: Bytes) -> Self {
        Content::Binary(value)
    }
}

impl From<Vec<u8>> for Content {
    fn from(value: Vec<u8>) -> Self {
        Content::Binary(Bytes::from(value))
    }
}

impl From<&'static [u8]> for Content {
    fn from(value: &'static [u8]) -> Self {
        Content::Binary(Bytes::from_static(value))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Content {
    fn from(value: &'static [u8; N]) -> Self {
        Content::Binary(Bytes::from_static(value))
    }
}

/// Coerces text, binary or absent content into bytes.
///
/// Text is encoded as UTF-8, `None` becomes an empty buffer and binary input
/// is passed through as is. Lazy content cannot be coerced and yields
/// [`ContentError::UnsupportedContentKind`].
pub fn to_bytes(value: Option<Content>) -> Result<Bytes, ContentError> {
    match value {
        None => Ok(Bytes::new()),
        Some(Content::Text(Cow::Borrowed(text))) => Ok(Bytes::from_static(text.as_bytes())),
        Some(Content::Text(Cow::Owned(text))) => Ok(Bytes::from(text.into_bytes())),
        Some(Content::Binary(bytes)) => Ok(bytes),
        Some(other) => Err(ContentError::unsupported_content_kind(other.kind_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_utf8_encoded() {
        assert_eq!(to_bytes(Some("hello".into())).unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(to_bytes(Some(String::from("h\u{e9}").into())).unwrap().as_ref(), [b'h', 0xc3, 0xa9]);
    }

    #[test]
    fn absent_is_empty() {
        assert!(to_bytes(None).unwrap().is_empty());
    }

    #[test]
    fn binary_passes_through_without_copy() {
        let bytes = Bytes::from(vec![0u8, 1, 2]);
        let ptr = bytes.as_ptr();
        let coerced = to_bytes(Some(bytes.into())).unwrap();
        assert_eq!(coerced.as_ptr(), ptr);
        assert_eq!(coerced.as_ref(), [0, 1, 2]);
    }

    #[test]
    fn lazy_content_is_rejected() {
        let iter = Content::iter(vec![Bytes::from_static(b"a")]);
        assert_eq!(to_bytes(Some(iter)), Err(ContentError::unsupported_content_kind("iterator")));

        let stream = Content::stream(futures::stream::empty::<Bytes>());
        assert_eq!(to_bytes(Some(stream)), Err(ContentError::unsupported_content_kind("async iterator")));
    }
}
