use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};

use crate::codec::{BodyTokens, Control, Token};
use crate::protocol::ExchangeError;

/// Payload chunks of a response as an [`http_body::Body`].
///
/// Control markers and kind tags are dropped, every chunk becomes one data
/// frame. When all remaining bodies are materialized the size hint is exact,
/// so a writer can choose a content length over chunked transfer.
#[derive(Debug)]
pub struct TokenBody<'a> {
    tokens: BodyTokens<'a>,
    in_chunk: bool,
}

impl<'a> TokenBody<'a> {
    pub(crate) fn new(tokens: BodyTokens<'a>) -> Self {
        Self { tokens, in_chunk: false }
    }
}

impl Body for TokenBody<'_> {
    type Data = Bytes;
    type Error = ExchangeError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        loop {
            match ready!(this.tokens.poll_token(Some(cx))) {
                Some(Ok(Token::Control(Control::Chunk))) => this.in_chunk = true,
                Some(Ok(Token::Data(bytes))) if this.in_chunk => {
                    this.in_chunk = false;
                    return Poll::Ready(Some(Ok(Frame::data(bytes))));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Poll::Ready(Some(Err(e.into()))),
                None => return Poll::Ready(None),
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.tokens.is_finished()
    }

    fn size_hint(&self) -> SizeHint {
        match self.tokens.remaining_len() {
            Some(length) => SizeHint::with_exact(length),
            None => SizeHint::default(),
        }
    }
}
