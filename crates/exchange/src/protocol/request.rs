//! Pooled state of one inbound exchange.
//!
//! A [`RequestState`] moves through `Initialized → Open → Closed`. The
//! transport opens it when the exchange starts and closes it when the exchange
//! ends, at which point the registered close callback runs exactly once.

use std::fmt;
use std::path::PathBuf;

use http::request::Parts;
use http::{Extensions, Method, Uri, Version};
use tracing::debug;

use crate::pool::Reset;
use crate::protocol::{Headers, LifecycleError};

/// Lifecycle step of a [`RequestState`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RequestStep {
    #[default]
    Initialized,
    Open,
    Closed,
}

impl RequestStep {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStep::Initialized => "Initialized",
            RequestStep::Open => "Open",
            RequestStep::Closed => "Closed",
        }
    }
}

/// Callback run when a request is closed.
pub type CloseCallback = Box<dyn FnOnce(&mut RequestState) + Send>;

/// Handle to a file uploaded with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// The form field the file was sent under
    pub field: String,
    /// The client supplied file name, if any
    pub file_name: Option<String>,
    /// Where the upload was spooled to
    pub path: PathBuf,
    pub content_type: Option<mime::Mime>,
    pub size: u64,
}

/// Pooled state of one inbound request: its head, parsed inputs and lifecycle.
#[derive(Default)]
pub struct RequestState {
    step: RequestStep,
    method: Method,
    uri: Uri,
    version: Version,
    headers: Headers,
    params: Vec<(String, String)>,
    files: Vec<UploadedFile>,
    extensions: Extensions,
    on_close: Option<CloseCallback>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn step(&self) -> RequestStep {
        self.step
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.step == RequestStep::Open
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.step == RequestStep::Closed
    }

    /// Starts the exchange.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] unless the request is
    /// `Initialized`. The step is left untouched in that case.
    pub fn open(&mut self) -> Result<&mut Self, LifecycleError> {
        if self.step != RequestStep::Initialized {
            return Err(LifecycleError::invalid_transition(self.step.as_str(), RequestStep::Open.as_str()));
        }

        self.step = RequestStep::Open;
        debug!(method = %self.method, uri = %self.uri, "request opened");
        Ok(self)
    }

    /// Ends the exchange and runs the close callback, if one is registered.
    ///
    /// Closing a closed request does nothing: the callback has already been
    /// consumed and is never invoked again.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the request was
    /// never opened.
    pub fn close(&mut self) -> Result<&mut Self, LifecycleError> {
        match self.step {
            RequestStep::Open => {
                self.step = RequestStep::Closed;
                debug!(method = %self.method, uri = %self.uri, "request closed");
                if let Some(callback) = self.on_close.take() {
                    callback(self);
                }
                Ok(self)
            }
            RequestStep::Closed => Ok(self),
            RequestStep::Initialized => {
                Err(LifecycleError::invalid_transition(self.step.as_str(), RequestStep::Closed.as_str()))
            }
        }
    }

    /// Registers the close callback, replacing any previous one.
    pub fn on_close<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&mut RequestState) + Send + 'static,
    {
        self.on_close = Some(Box::new(callback));
        self
    }

    pub fn clear_on_close(&mut self) -> &mut Self {
        self.on_close = None;
        self
    }

    pub fn has_on_close(&self) -> bool {
        self.on_close.is_some()
    }

    /// Loads the request line and headers decoded by the transport.
    pub fn load_head(&mut self, parts: Parts) -> &mut Self {
        self.method = parts.method;
        self.uri = parts.uri;
        self.version = parts.version;
        self.headers.reset();
        self.headers.extend_from(&parts.headers);
        self.extensions = parts.extensions;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn add_param(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// The first value of the parameter `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn add_file(&mut self, file: UploadedFile) -> &mut Self {
        self.files.push(file);
        self
    }

    /// The first file uploaded under the form field `field`.
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|file| file.field == field)
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// Request scoped data owned by other layers.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

impl Reset for RequestState {
    /// Returns to `Initialized`, drops the close callback and every piece of
    /// request data. Allocations of the header, parameter and file lists are
    /// kept.
    fn reset(&mut self) {
        self.step = RequestStep::Initialized;
        self.on_close = None;
        self.method = Method::default();
        self.uri = Uri::default();
        self.version = Version::default();
        self.headers.reset();
        self.params.clear();
        self.files.clear();
        self.extensions.clear();
    }
}

impl fmt::Debug for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestState")
            .field("step", &self.step)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("files", &self.files)
            .field("on_close", &self.on_close.is_some())
            .finish_non_exhaustive()
    }
}
