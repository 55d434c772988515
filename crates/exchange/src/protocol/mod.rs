//! Core request/response exchange abstractions.
//!
//! This module holds the per-exchange state a server mutates while handling
//! one HTTP request, together with the value types it is built from.
//!
//! # Architecture
//!
//! - **Content** ([`content`]): everything a handler may hand over as a body
//!   - [`Content`]: text, binary, or a lazy producer of chunks
//!   - [`to_bytes`]: coerces materialized content to bytes
//!
//! - **Headers** ([`header`]): ordered multi-valued header map
//!   - [`Headers`]: case-sensitive names, insertion order preserved
//!   - [`HeaderValues`]: one value or an ordered list
//!
//! - **Bodies** ([`body`]): one unit of response output
//!   - [`BodyUnit`]: a [`Body`] tagged with its media type
//!   - [`BodyKind`]: the tag carried in the token stream
//!
//! - **Request** ([`request`]): inbound exchange state with a one-shot close callback
//! - **Response** ([`response`]): status, headers and ordered bodies
//! - **Errors** ([`error`]): [`ExchangeError`] and its parts
//!
//! Both states implement [`crate::pool::Reset`] so they can be recycled
//! through a [`crate::pool::Pool`].

pub mod body;
pub mod content;
pub mod header;
pub mod request;
pub mod response;

mod error;

pub use body::{Body, BodyKind, BodyUnit};
pub use content::{to_bytes, BodyIter, BodyStream, Content};
pub use error::{ContentError, ExchangeError, LifecycleError, PoolError};
pub use header::{HeaderValues, Headers};
pub use request::{CloseCallback, RequestState, RequestStep, UploadedFile};
pub use response::{ResponseHead, ResponseState, ResponseStep};
