//! Request/response exchange core for a micro HTTP server
//!
//! This crate holds the state a server keeps while handling one HTTP
//! exchange, independent of how bytes reach the socket:
//!
//! - a request state with a small lifecycle and a one-shot close callback
//! - a response state holding a status, headers and an ordered list of
//!   bodies, some of which produce their payload lazily
//! - a streaming encoder draining those bodies into a flat token sequence
//! - an object pool recycling request and response states between exchanges
//!
//! # Example
//!
//! ```
//! use micro_exchange::config::ExchangeConfig;
//! use micro_exchange::codec::Token;
//!
//! let config = ExchangeConfig::default();
//! let requests = config.request_pool();
//! let responses = config.response_pool();
//!
//! let mut request = requests.acquire().unwrap();
//! request.open().unwrap();
//!
//! let mut response = responses.acquire().unwrap();
//! response.set_status(200).set_header("X-Trace", "1");
//! response.set_content("Hello World!\r\n").unwrap();
//!
//! let head = response.head().unwrap();
//! assert_eq!(head.status(), http::StatusCode::OK);
//!
//! let chunks: Vec<_> = response
//!     .tokens()
//!     .filter_map(|token| token.ok().and_then(Token::into_data))
//!     .collect();
//! assert_eq!(chunks.len(), 2);
//!
//! request.close().unwrap();
//! requests.release(request).unwrap();
//! responses.release(response).unwrap();
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: request, response, header, body and content types
//! - [`codec`]: the body token encoder
//! - [`pool`]: bounded object pool with reset-on-release
//! - [`config`]: pool sizing and default media types
//!
//! # Error Handling
//!
//! Fallible operations return [`protocol::ExchangeError`] or one of its parts:
//!
//! - [`protocol::ContentError`]: content that cannot be coerced or is missing a media type
//! - [`protocol::LifecycleError`]: an invalid request or response state transition
//! - [`protocol::PoolError`]: foreign releases, pool exhaustion and invalid pool bounds

pub mod codec;
pub mod config;
pub mod pool;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
