use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use tokio::sync::Mutex;
use weft_http::protocol::body::ReqBody;
use weft_http::protocol::{HttpError, ParseError};

/// Shared, at-most-once-consumable handle over a request body.
///
/// The body travels with every clone of the request, but only one consumer
/// may actually read it; a second attempt observes an error instead of
/// silently re-reading. Waiting for body bytes suspends on the underlying
/// [`ReqBody`] channel.
#[derive(Debug, Clone)]
pub struct OptionReqBody {
    inner: Arc<Mutex<Option<ReqBody>>>,
}

impl From<ReqBody> for OptionReqBody {
    fn from(body: ReqBody) -> Self {
        OptionReqBody { inner: Arc::new(Mutex::new(Some(body))) }
    }
}

impl OptionReqBody {
    /// An already-consumed-looking empty body.
    pub fn empty() -> Self {
        ReqBody::empty().into()
    }

    /// Returns true if the body has not been consumed yet.
    pub async fn can_consume(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.is_some()
    }

    /// Consumes the body through `f`.
    ///
    /// Fails with an invalid-body error if it was consumed before.
    pub async fn apply<T, F, Fut>(&self, f: F) -> Fut::Output
    where
        F: FnOnce(ReqBody) -> Fut,
        Fut: Future<Output = Result<T, ParseError>>,
    {
        let mut guard = self.inner.lock().await;
        match guard.take() {
            Some(req_body) => f(req_body).await,
            None => Err(ParseError::invalid_body("body has been consumed")),
        }
    }

    /// Collects the whole body into memory, suspending until it is complete.
    pub async fn collect_bytes(&self) -> Result<Bytes, ParseError> {
        self.apply(|body| async { body.collect().await.map(|collected| collected.to_bytes()) }).await
    }
}

/// Response body: either a single in-memory chunk or a boxed stream.
pub struct ResponseBody {
    inner: Kind,
}

enum Kind {
    Once(Option<Bytes>),
    Stream(UnsyncBoxBody<Bytes, HttpError>),
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        Self { inner: Kind::Once(Some(bytes)) }
    }

    pub fn stream<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes, Error = HttpError> + Send + 'static,
    {
        Self { inner: Kind::Stream(UnsyncBoxBody::new(body)) }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Kind::Once(bytes) => f.debug_tuple("ResponseBody::Once").field(&bytes.as_ref().map(Bytes::len)).finish(),
            Kind::Stream(_) => f.debug_tuple("ResponseBody::Stream").finish(),
        }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self::once(bytes) }
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Bytes::from(value).into()
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(value: Vec<u8>) -> Self {
        Bytes::from(value).into()
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Bytes::from_static(value.as_bytes()).into()
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl From<Option<Bytes>> for ResponseBody {
    fn from(option: Option<Bytes>) -> Self {
        match option {
            Some(bytes) => bytes.into(),
            None => Self::empty(),
        }
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = HttpError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().inner {
            Kind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Stream(box_body) => Pin::new(box_body).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            Kind::Once(option_bytes) => option_bytes.is_none(),
            Kind::Stream(box_body) => box_body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Stream(box_body) => box_body.size_hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_send<T: Send>() {}

    #[test]
    fn response_body_is_send() {
        check_send::<ResponseBody>();
    }

    #[tokio::test]
    async fn once_body_round_trip() {
        let body = ResponseBody::from("Hello world".to_string());
        assert_eq!(body.size_hint().exact(), Some(11));
        assert!(!body.is_end_stream());

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(bytes, Bytes::from("Hello world"));
    }

    #[tokio::test]
    async fn empty_body() {
        let mut body = ResponseBody::from("");
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
        assert!(body.frame().await.is_none());
    }

    #[tokio::test]
    async fn req_body_consumed_once() {
        let body: OptionReqBody = ReqBody::from("payload").into();
        assert!(body.can_consume().await);

        let bytes = body.collect_bytes().await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"payload"));

        assert!(!body.can_consume().await);
        let second = body.collect_bytes().await;
        assert!(matches!(second, Err(ParseError::InvalidBody { .. })));
    }

    #[tokio::test]
    async fn req_body_shared_across_clones() {
        let body: OptionReqBody = ReqBody::from("only once").into();
        let cloned = body.clone();

        cloned.collect_bytes().await.unwrap();
        assert!(!body.can_consume().await);
    }
}
