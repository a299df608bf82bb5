use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};

use http_body::{Body, Frame, SizeHint};
use tracing::error;

use crate::protocol::{ParseError, PayloadItem, PayloadSize};

/// Streaming HTTP request body.
///
/// `ReqBody` is the consumer side of a request body. The transport layer
/// feeds chunks through the matching [`BodySender`] as they arrive on the
/// wire, and anything holding the `ReqBody` (typically an argument binder
/// waiting for body data) suspends on `poll_frame` until the next chunk is
/// available. This keeps body consumption fully asynchronous without
/// buffering the whole payload in memory.
///
/// Bodies that are already in memory (tests, replays, wrapped bodies built
/// by filters) can be constructed directly from `Bytes` or strings.
#[derive(Debug)]
pub struct ReqBody {
    inner: Kind,
}

#[derive(Debug)]
enum Kind {
    Once(Option<Bytes>),
    Channel { receiver: mpsc::Receiver<Result<PayloadItem, ParseError>>, size: PayloadSize, done: bool },
}

/// Producer side of a streaming request body.
///
/// The transport pushes each decoded chunk with [`BodySender::send_chunk`]
/// and terminates the stream with [`BodySender::finish`] or
/// [`BodySender::fail`]. Dropping the sender without finishing surfaces as a
/// body error on the consumer side, never as a silent EOF.
#[derive(Debug)]
pub struct BodySender {
    sender: mpsc::Sender<Result<PayloadItem, ParseError>>,
}

impl ReqBody {
    /// Creates an empty body.
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    /// Creates a streaming body pair for the given payload size.
    ///
    /// The returned [`BodySender`] is handed to the transport; the `ReqBody`
    /// travels with the request into the engine.
    pub fn channel(size: PayloadSize) -> (BodySender, ReqBody) {
        let (sender, receiver) = mpsc::channel(16);
        (BodySender { sender }, ReqBody { inner: Kind::Channel { receiver, size, done: false } })
    }
}

impl From<Bytes> for ReqBody {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Kind::Once(Some(bytes)) } }
    }
}

impl From<&'static str> for ReqBody {
    fn from(value: &'static str) -> Self {
        Bytes::from_static(value.as_bytes()).into()
    }
}

impl From<String> for ReqBody {
    fn from(value: String) -> Self {
        Bytes::from(value).into()
    }
}

impl BodySender {
    /// Sends one chunk of payload data to the consumer.
    pub async fn send_chunk(&mut self, bytes: Bytes) -> Result<(), ParseError> {
        self.send(Ok(PayloadItem::Chunk(bytes))).await
    }

    /// Marks the body as complete.
    pub async fn finish(mut self) -> Result<(), ParseError> {
        self.send(Ok(PayloadItem::Eof)).await
    }

    /// Terminates the body with an error, e.g. when the connection dies
    /// mid-payload. The consumer observes the error on its next read.
    pub async fn fail(mut self, error: ParseError) -> Result<(), ParseError> {
        self.send(Err(error)).await
    }

    async fn send(&mut self, item: Result<PayloadItem, ParseError>) -> Result<(), ParseError> {
        if let Err(e) = self.sender.send(item).await {
            error!("failed to send payload body through channel, {}", e);
            return Err(ParseError::invalid_body("send body data error"));
        }
        Ok(())
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().inner {
            Kind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Channel { done, .. } if *done => Poll::Ready(None),
            Kind::Channel { receiver, done, .. } => match receiver.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(PayloadItem::Chunk(bytes)))) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
                Poll::Ready(Some(Ok(PayloadItem::Eof))) => {
                    *done = true;
                    Poll::Ready(None)
                }
                Poll::Ready(Some(Err(e))) => {
                    *done = true;
                    Poll::Ready(Some(Err(e)))
                }
                Poll::Ready(None) => {
                    *done = true;
                    Poll::Ready(Some(Err(ParseError::invalid_body("request body channel closed before eof"))))
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            Kind::Once(option_bytes) => option_bytes.is_none(),
            Kind::Channel { done, .. } => *done,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Channel { size, .. } => (*size).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn once_body_yields_single_frame() {
        let body = ReqBody::from("hello world");
        assert_eq!(body.size_hint().exact(), Some(11));

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn empty_body_is_end_of_stream() {
        let mut body = ReqBody::empty();
        assert!(body.is_end_stream());
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn channel_body_streams_chunks_in_order() {
        let (mut sender, body) = ReqBody::channel(PayloadSize::Length(10));
        assert_eq!(body.size_hint().exact(), Some(10));

        let producer = tokio::spawn(async move {
            sender.send_chunk(Bytes::from_static(b"hello ")).await.unwrap();
            sender.send_chunk(Bytes::from_static(b"body")).await.unwrap();
            sender.finish().await.unwrap();
        });

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"hello body"));
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn channel_body_surfaces_failure() {
        let (sender, body) = ReqBody::channel(PayloadSize::Chunked);

        tokio::spawn(async move {
            sender.fail(ParseError::invalid_body("connection lost")).await.unwrap();
        });

        let err = body.collect().await.unwrap_err();
        assert!(matches!(err, ParseError::InvalidBody { .. }));
    }

    #[tokio::test]
    async fn dropped_sender_is_an_error_not_eof() {
        let (sender, body) = ReqBody::channel(PayloadSize::Chunked);
        drop(sender);

        let err = body.collect().await.unwrap_err();
        assert!(matches!(err, ParseError::InvalidBody { .. }));
    }
}
