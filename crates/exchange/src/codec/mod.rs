//! Streaming encoder turning a response's bodies into a flat token sequence
//!
//! A response holds an ordered list of body units, some of which produce
//! their payload lazily. The encoder drains that list and yields, in order:
//!
//! - [`Control::Type`] followed by the body's kind tag as [`Token::Data`]
//! - for each payload chunk, [`Control::Chunk`] followed by the chunk as [`Token::Data`]
//! - a single [`Control::End`] once every body has been drained
//!
//! `Empty` bodies produce no chunk, `Value` bodies exactly one, lazy bodies
//! one per item their producer yields.
//!
//! # Example
//!
//! ```
//! use micro_exchange::codec::{Control, Token};
//! use micro_exchange::protocol::ResponseState;
//!
//! let mut response = ResponseState::new();
//! response.set_content_with_type("A", "text/plain").unwrap();
//!
//! let tokens: Vec<Token> = response.tokens().collect::<Result<_, _>>().unwrap();
//! assert_eq!(tokens[0], Token::Control(Control::Type));
//! assert!(tokens.last().unwrap().is_end());
//! ```
//!
//! Writers that need an [`http_body::Body`] rather than tokens use
//! [`BodyTokens::into_body`].

mod body_tokens;
mod token;
mod token_body;

pub use body_tokens::{BodyTokens, TokenStream};
pub use token::{Control, Token};
pub use token_body::TokenBody;
