//! Configuration of the exchange core.
//!
//! The only tunables are the pool sizing policy and the media types used when
//! content is set on a response without one.

use bytes::Bytes;

use crate::ensure;
use crate::pool::{Pool, PoolConfig};
use crate::protocol::{ContentError, ExchangeError, RequestState, ResponseState};

/// Media type for binary content set without an explicit type.
pub const DEFAULT_BINARY_CONTENT_TYPE: &str = "application/binary";

/// Media types applied by [`ResponseState::set_content`] when none is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDefaults {
    text: Bytes,
    binary: Bytes,
}

impl Default for ContentDefaults {
    fn default() -> Self {
        Self {
            text: Bytes::copy_from_slice(mime::TEXT_PLAIN_UTF_8.as_ref().as_bytes()),
            binary: Bytes::from_static(DEFAULT_BINARY_CONTENT_TYPE.as_bytes()),
        }
    }
}

impl ContentDefaults {
    /// # Errors
    ///
    /// Returns [`ContentError::MissingContentType`] if either media type is empty.
    pub fn new(text: impl Into<Bytes>, binary: impl Into<Bytes>) -> Result<Self, ContentError> {
        let text = text.into();
        let binary = binary.into();
        ensure!(!text.is_empty(), ContentError::missing_content_type("text"));
        ensure!(!binary.is_empty(), ContentError::missing_content_type("binary"));
        Ok(Self { text, binary })
    }

    /// Media type of text content, `text/plain; charset=utf-8` by default.
    #[inline]
    pub fn text(&self) -> &Bytes {
        &self.text
    }

    /// Media type of binary content, `application/binary` by default.
    #[inline]
    pub fn binary(&self) -> &Bytes {
        &self.binary
    }
}

/// Pool sizing and content defaults shared by every exchange of a server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeConfig {
    pool: PoolConfig,
    content: ContentDefaults,
}

impl ExchangeConfig {
    pub fn builder() -> ExchangeConfigBuilder {
        ExchangeConfigBuilder::new()
    }

    pub fn pool(&self) -> &PoolConfig {
        &self.pool
    }

    pub fn content(&self) -> &ContentDefaults {
        &self.content
    }

    /// A pool of requests sized by this configuration.
    pub fn request_pool(&self) -> Pool<RequestState> {
        Pool::new(self.pool)
    }

    /// A pool of responses sized by this configuration, each response using
    /// the configured content defaults.
    pub fn response_pool(&self) -> Pool<ResponseState> {
        let content = self.content.clone();
        Pool::with_factory(self.pool, move || ResponseState::with_defaults(content.clone()))
    }
}

#[derive(Debug)]
pub struct ExchangeConfigBuilder {
    pool: PoolConfig,
    text_content_type: Option<Bytes>,
    binary_content_type: Option<Bytes>,
}

impl ExchangeConfigBuilder {
    fn new() -> Self {
        Self { pool: PoolConfig::default(), text_content_type: None, binary_content_type: None }
    }

    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn max_outstanding(mut self, max_outstanding: usize) -> Self {
        self.pool.max_outstanding = Some(max_outstanding);
        self
    }

    pub fn max_idle(mut self, max_idle: usize) -> Self {
        self.pool.max_idle = max_idle;
        self
    }

    pub fn text_content_type(mut self, content_type: impl Into<Bytes>) -> Self {
        self.text_content_type = Some(content_type.into());
        self
    }

    pub fn binary_content_type(mut self, content_type: impl Into<Bytes>) -> Self {
        self.binary_content_type = Some(content_type.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`ExchangeError::Pool`] if the pool bound is outside
    /// `1..=MAX_OUTSTANDING`, [`ExchangeError::Content`] if a default media
    /// type was set to an empty value.
    pub fn build(self) -> Result<ExchangeConfig, ExchangeError> {
        self.pool.validate()?;
        let defaults = ContentDefaults::default();
        let content = ContentDefaults::new(
            self.text_content_type.unwrap_or(defaults.text),
            self.binary_content_type.unwrap_or(defaults.binary),
        )?;
        Ok(ExchangeConfig { pool: self.pool, content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::MAX_OUTSTANDING;
    use crate::protocol::PoolError;

    #[test]
    fn defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.content().text(), &Bytes::from_static(b"text/plain; charset=utf-8"));
        assert_eq!(config.content().binary(), &Bytes::from_static(b"application/binary"));
        assert_eq!(config.pool(), &PoolConfig::unbounded());
    }

    #[test]
    fn builder_overrides() {
        let config = ExchangeConfig::builder()
            .max_outstanding(16)
            .max_idle(8)
            .binary_content_type("application/octet-stream")
            .build()
            .unwrap();

        assert_eq!(config.pool().max_outstanding, Some(16));
        assert_eq!(config.pool().max_idle, 8);
        assert_eq!(config.content().binary(), &Bytes::from_static(b"application/octet-stream"));
        assert_eq!(config.content().text(), ContentDefaults::default().text());
    }

    #[test]
    fn empty_default_is_rejected() {
        let error = ExchangeConfig::builder().text_content_type("").build().unwrap_err();
        assert!(matches!(
            error,
            ExchangeError::Content { source } if source == ContentError::missing_content_type("text")
        ));
    }

    #[test]
    fn out_of_range_pool_bounds_are_rejected() {
        for max_outstanding in [0, usize::MAX] {
            let error = ExchangeConfig::builder().max_outstanding(max_outstanding).build().unwrap_err();
            assert!(matches!(
                error,
                ExchangeError::Pool { source: PoolError::InvalidSize { max_outstanding: got, .. } } if got == max_outstanding
            ));
        }

        let config = ExchangeConfig::builder().max_outstanding(MAX_OUTSTANDING).build().unwrap();
        assert!(config.request_pool().acquire().is_ok());
    }

    #[test]
    fn response_pool_applies_content_defaults() {
        let config = ExchangeConfig::builder().binary_content_type("application/octet-stream").build().unwrap();
        let pool = config.response_pool();

        let mut response = pool.acquire().unwrap();
        response.set_content(vec![1u8, 2]).unwrap();
        assert_eq!(response.bodies()[0].content_type(), &Bytes::from_static(b"application/octet-stream"));
        pool.release(response).unwrap();

        let request_pool = config.request_pool();
        assert!(request_pool.acquire().is_ok());
    }
}
