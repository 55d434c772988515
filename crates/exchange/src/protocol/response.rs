//! Pooled state of one outbound exchange.
//!
//! Application code fills a [`ResponseState`] with a status, headers and an
//! ordered list of body units. The transport then reads the head and drains
//! the bodies through [`ResponseState::tokens`].

use bytes::Bytes;
use futures::Stream;
use http::{Response, StatusCode};
use tracing::debug;

use crate::codec::BodyTokens;
use crate::config::ContentDefaults;
use crate::pool::Reset;
use crate::protocol::body::kind_name;
use crate::protocol::content::to_bytes;
use crate::protocol::{Body, BodyUnit, Content, ContentError, ExchangeError, Headers, LifecycleError};

/// Type alias for HTTP response headers.
///
/// The header portion of a response as `http::Response<()>`; bodies travel
/// separately as tokens.
pub type ResponseHead = Response<()>;

/// Lifecycle step of a [`ResponseState`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStep {
    #[default]
    Initialized,
    Ready,
    Sent,
}

impl ResponseStep {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseStep::Initialized => "Initialized",
            ResponseStep::Ready => "Ready",
            ResponseStep::Sent => "Sent",
        }
    }
}

/// Pooled state of one outbound response: status, headers and ordered bodies.
#[derive(Debug)]
pub struct ResponseState {
    step: ResponseStep,
    // 0 means unset
    status: u16,
    headers: Option<Headers>,
    bodies: Vec<BodyUnit>,
    defaults: ContentDefaults,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self::with_defaults(ContentDefaults::default())
    }
}

impl ResponseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a response applying `defaults` to content set without a type.
    pub fn with_defaults(defaults: ContentDefaults) -> Self {
        Self { step: ResponseStep::Initialized, status: 0, headers: Some(Headers::new()), bodies: Vec::new(), defaults }
    }

    /// Sets every field of the response explicitly.
    ///
    /// `bodies: None` empties the current body list in place.
    pub fn init(&mut self, step: ResponseStep, bodies: Option<Vec<BodyUnit>>, headers: Option<Headers>, status: u16) -> &mut Self {
        self.step = step;
        match bodies {
            Some(bodies) => self.bodies = bodies,
            None => self.bodies.clear(),
        }
        self.headers = headers;
        self.status = status;
        self
    }

    #[inline]
    pub fn step(&self) -> ResponseStep {
        self.step
    }

    /// Marks the response as fully populated.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the response is `Initialized`.
    pub fn ready(&mut self) -> Result<&mut Self, LifecycleError> {
        self.transition(ResponseStep::Initialized, ResponseStep::Ready)
    }

    /// Marks the response as written out by the transport.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the response is `Ready`.
    pub fn mark_sent(&mut self) -> Result<&mut Self, LifecycleError> {
        self.transition(ResponseStep::Ready, ResponseStep::Sent)
    }

    fn transition(&mut self, from: ResponseStep, to: ResponseStep) -> Result<&mut Self, LifecycleError> {
        if self.step != from {
            return Err(LifecycleError::invalid_transition(self.step.as_str(), to.as_str()));
        }
        self.step = to;
        debug!(status = self.status, bodies = self.bodies.len(), step = to.as_str(), "response step changed");
        Ok(self)
    }

    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    /// The header map, created empty if the response has none.
    pub fn headers_mut(&mut self) -> &mut Headers {
        self.headers.get_or_insert_with(Headers::new)
    }

    pub fn set_header(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> &mut Self {
        self.headers_mut().set(name, value);
        self
    }

    pub fn add_header(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> &mut Self {
        self.headers_mut().add(name, value);
        self
    }

    /// Sets each pair, replacing earlier values for the same name.
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        self.headers_mut().update(headers);
        self
    }

    /// Appends content using the default media type for its kind.
    ///
    /// Text becomes a `Value` body typed with the text default, binary a
    /// `Value` body typed with the binary default.
    ///
    /// # Errors
    ///
    /// Lazy content has no default type and fails with
    /// [`ContentError::MissingContentType`].
    pub fn set_content(&mut self, content: impl Into<Content>) -> Result<&mut Self, ContentError> {
        self.push_content(content.into(), None)
    }

    /// Appends content with an explicit media type.
    ///
    /// Lazy content is stored as given: a [`Content::Iterator`] becomes an
    /// `Iterator` body, a [`Content::AsyncIterator`] an `AsyncIterator` body.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::UnsupportedContentKind`] if the media type is
    /// itself lazy content, [`ContentError::MissingContentType`] if it is empty.
    pub fn set_content_with_type(
        &mut self,
        content: impl Into<Content>,
        content_type: impl Into<Content>,
    ) -> Result<&mut Self, ContentError> {
        let content_type = to_bytes(Some(content_type.into()))?;
        self.push_content(content.into(), Some(content_type))
    }

    /// Appends a body unit without content.
    ///
    /// # Errors
    ///
    /// Same as [`ResponseState::set_content_with_type`] for the media type.
    pub fn add_empty(&mut self, content_type: impl Into<Content>) -> Result<&mut Self, ContentError> {
        let content_type = to_bytes(Some(content_type.into()))?;
        self.bodies.push(BodyUnit::new(Body::Empty, content_type)?);
        Ok(self)
    }

    /// Appends chunks produced by a synchronous iterator.
    ///
    /// # Errors
    ///
    /// Same as [`ResponseState::set_content_with_type`] for the media type.
    pub fn add_iter<I>(&mut self, iter: I, content_type: impl Into<Content>) -> Result<&mut Self, ContentError>
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        self.set_content_with_type(Content::iter(iter), content_type)
    }

    /// Appends chunks produced by an asynchronous stream.
    ///
    /// # Errors
    ///
    /// Same as [`ResponseState::set_content_with_type`] for the media type.
    pub fn add_stream<S>(&mut self, stream: S, content_type: impl Into<Content>) -> Result<&mut Self, ContentError>
    where
        S: Stream<Item = Bytes> + Send + 'static,
    {
        self.set_content_with_type(Content::stream(stream), content_type)
    }

    fn push_content(&mut self, content: Content, content_type: Option<Bytes>) -> Result<&mut Self, ContentError> {
        let (body, default_type) = match content {
            text @ Content::Text(_) => (Body::Value(to_bytes(Some(text))?), Some(self.defaults.text().clone())),
            Content::Binary(bytes) => (Body::Value(bytes), Some(self.defaults.binary().clone())),
            Content::Iterator(iter) => (Body::Iterator(iter), None),
            Content::AsyncIterator(stream) => (Body::AsyncIterator(stream), None),
        };

        let content_type = match content_type.or(default_type) {
            Some(content_type) => content_type,
            None => return Err(ContentError::missing_content_type(kind_name(body.kind()))),
        };

        self.bodies.push(BodyUnit::new(body, content_type)?);
        Ok(self)
    }

    pub fn bodies(&self) -> &[BodyUnit] {
        &self.bodies
    }

    /// True when no body unit was appended, whatever the status.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn content_defaults(&self) -> &ContentDefaults {
        &self.defaults
    }

    /// Drains the body list into a token sequence.
    ///
    /// The sequence is not restartable: once it is consumed (or dropped) the
    /// response has no bodies left. The list keeps its allocation.
    pub fn tokens(&mut self) -> BodyTokens<'_> {
        BodyTokens::new(self.bodies.drain(..))
    }

    /// The status and headers as an [`http`] response head.
    ///
    /// An unset status is reported as `200 OK`.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::InvalidHead`] for a status outside `100..=999`
    /// or a header that is not legal in HTTP.
    pub fn head(&self) -> Result<ResponseHead, ExchangeError> {
        let status = match self.status {
            0 => StatusCode::OK,
            code => StatusCode::from_u16(code).map_err(|e| ExchangeError::invalid_head(format!("status {code}: {e}")))?,
        };

        let mut head = ResponseHead::new(());
        *head.status_mut() = status;
        if let Some(headers) = &self.headers {
            *head.headers_mut() = headers.to_header_map()?;
        }
        Ok(head)
    }
}

impl Reset for ResponseState {
    /// Clears the step, bodies, headers and status. The content defaults are
    /// configuration and survive.
    fn reset(&mut self) {
        self.step = ResponseStep::Initialized;
        self.bodies.clear();
        self.headers.get_or_insert_with(Headers::new).reset();
        self.status = 0;
    }
}
