//! Response body units.
//!
//! A response carries an ordered list of [`BodyUnit`]s. Each unit pairs a
//! [`Body`] with the media type it was declared with. The body is a closed
//! sum type, so "no content", "materialized bytes" and "lazy chunks" can never
//! be confused with each other once a unit is built.

use std::fmt;

use bytes::Bytes;

use crate::ensure;
use crate::protocol::ContentError;
use crate::protocol::content::{BodyIter, BodyStream};

/// The kind tag of a body, as emitted in the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Empty,
    Value,
    Iterator,
    AsyncIterator,
}

impl BodyKind {
    /// The binary tag written after a `Type` marker.
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            BodyKind::Empty => b"empty",
            BodyKind::Value => b"value",
            BodyKind::Iterator => b"iterator",
            BodyKind::AsyncIterator => b"asyncStream",
        }
    }

    #[inline]
    pub fn tag(self) -> Bytes {
        Bytes::from_static(self.as_bytes())
    }

    #[inline]
    pub fn is_lazy(self) -> bool {
        matches!(self, BodyKind::Iterator | BodyKind::AsyncIterator)
    }
}

/// The payload of one body unit.
pub enum Body {
    /// No content, nothing is emitted beyond the kind tag
    Empty,
    /// Materialized content
    Value(Bytes),
    /// Chunks pulled one at a time while streaming
    Iterator(BodyIter),
    /// Chunks polled one at a time while streaming
    AsyncIterator(BodyStream),
}

impl Body {
    pub fn kind(&self) -> BodyKind {
        match self {
            Body::Empty => BodyKind::Empty,
            Body::Value(_) => BodyKind::Value,
            Body::Iterator(_) => BodyKind::Iterator,
            Body::AsyncIterator(_) => BodyKind::AsyncIterator,
        }
    }

    /// Returns the materialized bytes if this is a `Value` body
    pub fn as_value(&self) -> Option<&Bytes> {
        match self {
            Body::Value(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Value(bytes) => f.debug_tuple("Value").field(bytes).finish(),
            Body::Iterator(_) => f.write_str("Iterator(..)"),
            Body::AsyncIterator(_) => f.write_str("AsyncIterator(..)"),
        }
    }
}

/// One chunk of response content and its declared media type.
///
/// Units are never mutated once built; the content type is never empty.
#[derive(Debug)]
pub struct BodyUnit {
    body: Body,
    content_type: Bytes,
}

impl BodyUnit {
    /// # Errors
    ///
    /// Returns [`ContentError::MissingContentType`] when `content_type` is empty.
    pub fn new(body: Body, content_type: Bytes) -> Result<Self, ContentError> {
        ensure!(!content_type.is_empty(), ContentError::missing_content_type(kind_name(body.kind())));
        Ok(Self { body, content_type })
    }

    #[inline]
    pub fn kind(&self) -> BodyKind {
        self.body.kind()
    }

    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    #[inline]
    pub fn content_type(&self) -> &Bytes {
        &self.content_type
    }

    pub fn into_parts(self) -> (Body, Bytes) {
        (self.body, self.content_type)
    }
}

pub(crate) fn kind_name(kind: BodyKind) -> &'static str {
    match kind {
        BodyKind::Empty => "empty",
        BodyKind::Value => "value",
        BodyKind::Iterator => "iterator",
        BodyKind::AsyncIterator => "async iterator",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_the_body() {
        let unit = BodyUnit::new(Body::Value(Bytes::from_static(b"A")), Bytes::from_static(b"text/plain")).unwrap();
        assert_eq!(unit.kind(), BodyKind::Value);
        assert_eq!(unit.body().as_value(), Some(&Bytes::from_static(b"A")));
        assert_eq!(unit.content_type(), &Bytes::from_static(b"text/plain"));

        let unit = BodyUnit::new(Body::Iterator(Box::new(std::iter::empty::<Bytes>())), Bytes::from_static(b"text/csv")).unwrap();
        assert_eq!(unit.kind(), BodyKind::Iterator);
        assert!(unit.kind().is_lazy());
        assert_eq!(unit.body().as_value(), None);
    }

    #[test]
    fn empty_content_type_is_rejected() {
        let error = BodyUnit::new(Body::Empty, Bytes::new()).unwrap_err();
        assert_eq!(error, ContentError::missing_content_type("empty"));
    }

    #[test]
    fn kind_tags() {
        assert_eq!(BodyKind::Empty.as_bytes(), b"empty");
        assert_eq!(BodyKind::Value.tag(), Bytes::from_static(b"value"));
        assert_eq!(BodyKind::Iterator.as_bytes(), b"iterator");
        assert_eq!(BodyKind::AsyncIterator.as_bytes(), b"asyncStream");
    }
}
