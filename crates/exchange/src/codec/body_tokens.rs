use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::vec;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::trace;

use crate::codec::{Control, Token, TokenBody};
use crate::protocol::{Body, BodyUnit, ContentError};

/// Token sequence drained from a response's body list.
///
/// Lazy bodies are pulled one chunk at a time, each chunk becoming its own
/// `Chunk` marker and data token, so a consumer that writes tokens as it
/// receives them controls how fast producers run.
///
/// Iterating drains synchronous bodies only; reaching an `AsyncIterator`
/// body yields [`ContentError::UnsupportedContentKind`] and ends the
/// sequence. [`BodyTokens::into_stream`] drains every body kind.
pub struct BodyTokens<'a> {
    bodies: vec::Drain<'a, BodyUnit>,
    state: State,
}

enum State {
    /// Emit `Type` for the next body, or `End`
    Next,
    /// `Type` emitted, the kind tag is next
    Kind(Body),
    /// Kind tag emitted, pull the next payload chunk
    Payload(Body),
    /// `Chunk` emitted, its data is next, then continue with the remaining body
    Chunk(Bytes, Option<Body>),
    Finished,
}

impl<'a> BodyTokens<'a> {
    pub(crate) fn new(bodies: vec::Drain<'a, BodyUnit>) -> Self {
        Self { bodies, state: State::Next }
    }

    /// Returns true once `End` has been produced, or the sequence failed
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished)
    }

    /// Total payload bytes still to come, if every remaining body is materialized.
    pub fn remaining_len(&self) -> Option<u64> {
        let pending = match &self.state {
            State::Next | State::Finished => 0,
            State::Kind(body) | State::Payload(body) => body_len(body)?,
            State::Chunk(bytes, None) => bytes.len() as u64,
            State::Chunk(_, Some(_)) => return None,
        };

        self.bodies.as_slice().iter().try_fold(pending, |total, unit| Some(total + body_len(unit.body())?))
    }

    /// Turns the sequence into a [`Stream`] able to drain async bodies.
    pub fn into_stream(self) -> TokenStream<'a> {
        TokenStream { tokens: self }
    }

    /// Turns the sequence into an [`http_body::Body`] of the payload chunks.
    pub fn into_body(self) -> TokenBody<'a> {
        TokenBody::new(self)
    }

    /// Produces the next token.
    ///
    /// Without a context an `AsyncIterator` body cannot be polled and is
    /// reported as unsupported.
    pub(crate) fn poll_token(&mut self, mut cx: Option<&mut Context<'_>>) -> Poll<Option<Result<Token, ContentError>>> {
        loop {
            match mem::replace(&mut self.state, State::Finished) {
                State::Next => {
                    return match self.bodies.next() {
                        Some(unit) => {
                            let (body, _content_type) = unit.into_parts();
                            self.state = State::Kind(body);
                            Poll::Ready(Some(Ok(Token::Control(Control::Type))))
                        }
                        None => {
                            trace!("all bodies drained, end token stream");
                            Poll::Ready(Some(Ok(Token::Control(Control::End))))
                        }
                    };
                }

                State::Kind(body) => {
                    let tag = body.kind().tag();
                    self.state = State::Payload(body);
                    return Poll::Ready(Some(Ok(Token::Data(tag))));
                }

                State::Payload(Body::Empty) => self.state = State::Next,

                State::Payload(Body::Value(bytes)) => {
                    self.state = State::Chunk(bytes, None);
                    return Poll::Ready(Some(Ok(Token::Control(Control::Chunk))));
                }

                State::Payload(Body::Iterator(mut iter)) => match iter.next() {
                    Some(chunk) => {
                        self.state = State::Chunk(chunk, Some(Body::Iterator(iter)));
                        return Poll::Ready(Some(Ok(Token::Control(Control::Chunk))));
                    }
                    None => self.state = State::Next,
                },

                State::Payload(Body::AsyncIterator(mut stream)) => {
                    let Some(cx) = cx.as_deref_mut() else {
                        // state stays Finished, the rest of the bodies are dropped with the drain
                        return Poll::Ready(Some(Err(ContentError::unsupported_content_kind("async iterator"))));
                    };

                    match stream.poll_next_unpin(cx) {
                        Poll::Ready(Some(chunk)) => {
                            self.state = State::Chunk(chunk, Some(Body::AsyncIterator(stream)));
                            return Poll::Ready(Some(Ok(Token::Control(Control::Chunk))));
                        }
                        Poll::Ready(None) => self.state = State::Next,
                        Poll::Pending => {
                            self.state = State::Payload(Body::AsyncIterator(stream));
                            return Poll::Pending;
                        }
                    }
                }

                State::Chunk(bytes, rest) => {
                    self.state = rest.map_or(State::Next, State::Payload);
                    return Poll::Ready(Some(Ok(Token::Data(bytes))));
                }

                State::Finished => return Poll::Ready(None),
            }
        }
    }
}

fn body_len(body: &Body) -> Option<u64> {
    match body {
        Body::Empty => Some(0),
        Body::Value(bytes) => Some(bytes.len() as u64),
        Body::Iterator(_) | Body::AsyncIterator(_) => None,
    }
}

impl Iterator for BodyTokens<'_> {
    type Item = Result<Token, ContentError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.poll_token(None) {
            Poll::Ready(item) => item,
            // only reachable with a context
            Poll::Pending => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_finished() { (0, Some(0)) } else { (1, None) }
    }
}

/// Asynchronous view of [`BodyTokens`].
#[derive(Debug)]
pub struct TokenStream<'a> {
    tokens: BodyTokens<'a>,
}

impl TokenStream<'_> {
    pub fn is_finished(&self) -> bool {
        self.tokens.is_finished()
    }
}

impl Stream for TokenStream<'_> {
    type Item = Result<Token, ContentError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().tokens.poll_token(Some(cx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.tokens.size_hint()
    }
}

impl std::fmt::Debug for BodyTokens<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyTokens")
            .field("remaining_bodies", &self.bodies.len())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use futures::stream;

    use super::*;
    use crate::protocol::{Content, ResponseState};

    fn control(control: Control) -> Token {
        Token::Control(control)
    }

    fn data(bytes: &'static [u8]) -> Token {
        Token::Data(Bytes::from_static(bytes))
    }

    fn collect_sync(response: &mut ResponseState) -> Vec<Token> {
        response.tokens().collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn value_and_empty_bodies() {
        let mut response = ResponseState::new();
        response.set_content_with_type("A", "text/plain").unwrap();
        response.add_empty("text/plain").unwrap();

        assert_eq!(
            collect_sync(&mut response),
            [
                control(Control::Type),
                data(b"value"),
                control(Control::Chunk),
                data(b"A"),
                control(Control::Type),
                data(b"empty"),
                control(Control::End),
            ]
        );
    }

    #[test]
    fn no_bodies_yield_only_end() {
        let mut response = ResponseState::new();
        assert_eq!(collect_sync(&mut response), [control(Control::End)]);
    }

    #[test]
    fn empty_value_still_emits_a_chunk() {
        let mut response = ResponseState::new();
        response.set_content("").unwrap();

        assert_eq!(
            collect_sync(&mut response),
            [control(Control::Type), data(b"value"), control(Control::Chunk), data(b""), control(Control::End)]
        );
    }

    #[test]
    fn iterator_bodies_emit_one_chunk_per_item() {
        let mut response = ResponseState::new();
        response.add_iter([Bytes::from_static(b"a,b\n"), Bytes::from_static(b"1,2\n")], "text/csv").unwrap();
        response.add_iter(Vec::<Bytes>::new(), "text/csv").unwrap();

        assert_eq!(
            collect_sync(&mut response),
            [
                control(Control::Type),
                data(b"iterator"),
                control(Control::Chunk),
                data(b"a,b\n"),
                control(Control::Chunk),
                data(b"1,2\n"),
                control(Control::Type),
                data(b"iterator"),
                control(Control::End),
            ]
        );
    }

    #[test]
    fn chunks_are_pulled_lazily() {
        let pulled = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = std::sync::Arc::clone(&pulled);
        let chunks = (0..3).map(move |i| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Bytes::from(format!("{i}"))
        });

        let mut response = ResponseState::new();
        response.add_iter(chunks, "text/plain").unwrap();

        let mut tokens = response.tokens();
        assert_eq!(tokens.next().unwrap().unwrap(), control(Control::Type));
        assert_eq!(tokens.next().unwrap().unwrap(), data(b"iterator"));
        assert_eq!(pulled.load(std::sync::atomic::Ordering::SeqCst), 0);

        assert_eq!(tokens.next().unwrap().unwrap(), control(Control::Chunk));
        assert_eq!(pulled.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn sync_iteration_rejects_async_bodies() {
        let mut response = ResponseState::new();
        response.set_content("first").unwrap();
        response.add_stream(stream::iter(vec![Bytes::from_static(b"x")]), "text/event-stream").unwrap();
        response.set_content("never").unwrap();

        let tokens: Vec<_> = response.tokens().collect();
        assert_eq!(tokens.len(), 7);
        assert_eq!(tokens[5], Ok(data(b"asyncStream")));
        assert_eq!(tokens[6], Err(ContentError::unsupported_content_kind("async iterator")));
        assert!(response.is_empty());
    }

    #[test]
    fn stream_drains_every_kind() {
        let mut response = ResponseState::new();
        response.set_content("head,").unwrap();
        response.add_stream(stream::iter(vec![Bytes::from_static(b"s1,"), Bytes::from_static(b"s2")]), "text/plain").unwrap();
        response.set_content_with_type(Content::iter(vec![Bytes::from_static(b",tail")]), "text/plain").unwrap();

        let tokens: Vec<_> = block_on(response.tokens().into_stream().collect::<Vec<_>>()).into_iter().map(Result::unwrap).collect();

        assert_eq!(
            tokens,
            [
                control(Control::Type),
                data(b"value"),
                control(Control::Chunk),
                data(b"head,"),
                control(Control::Type),
                data(b"asyncStream"),
                control(Control::Chunk),
                data(b"s1,"),
                control(Control::Chunk),
                data(b"s2"),
                control(Control::Type),
                data(b"iterator"),
                control(Control::Chunk),
                data(b",tail"),
                control(Control::End),
            ]
        );
    }

    #[tokio::test]
    async fn stream_waits_on_pending_producers() {
        let (mut sender, receiver) = futures::channel::mpsc::channel::<Bytes>(1);
        let mut response = ResponseState::new();
        response.add_stream(receiver, "text/event-stream").unwrap();

        let producer = tokio::spawn(async move {
            use futures::SinkExt;
            sender.send(Bytes::from_static(b"data: 1\n\n")).await.unwrap();
        });

        let tokens: Vec<_> = response.tokens().into_stream().map(Result::unwrap).collect().await;
        producer.await.unwrap();

        assert_eq!(tokens[3], data(b"data: 1\n\n"));
        assert!(tokens.last().is_some_and(Token::is_end));
    }

    #[test]
    fn exactly_one_end_and_not_restartable() {
        let mut response = ResponseState::new();
        response.set_content("a").unwrap().set_content("b").unwrap();

        let tokens = collect_sync(&mut response);
        assert_eq!(tokens.iter().filter(|token| token.is_end()).count(), 1);
        assert!(response.is_empty());

        let mut tokens = response.tokens();
        assert_eq!(tokens.next(), Some(Ok(control(Control::End))));
        assert_eq!(tokens.next(), None);
        assert!(tokens.is_finished());
    }

    #[test]
    fn dropping_tokens_discards_remaining_bodies() {
        let mut response = ResponseState::new();
        response.set_content("a").unwrap().set_content("b").unwrap();

        let mut tokens = response.tokens();
        assert!(tokens.next().is_some());
        drop(tokens);

        assert!(response.is_empty());
    }

    #[test]
    fn remaining_len_counts_materialized_bodies() {
        let mut response = ResponseState::new();
        response.set_content("abc").unwrap().set_content("de").unwrap();
        assert_eq!(response.tokens().remaining_len(), Some(5));

        response.set_content("abc").unwrap();
        response.add_iter(vec![Bytes::from_static(b"x")], "text/plain").unwrap();
        assert_eq!(response.tokens().remaining_len(), None);
    }
}
