use std::future::Future;

use async_trait::async_trait;
use http::Response;

use crate::arguments::Arguments;
use crate::body::ResponseBody;
use crate::context::FlowContext;
use crate::error::BoxError;
use crate::request::ServerRequest;
use crate::responder::Responder;

/// Invokes the business code bound to a route.
///
/// The pipeline drives the invocation; what the handler does with the
/// request is entirely its own affair. Failures returned here are routed
/// through the error resolution cascade.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn invoke(
        &self,
        request: &ServerRequest,
        context: &FlowContext,
        arguments: &Arguments,
    ) -> Result<Response<ResponseBody>, BoxError>;
}

/// Adapter turning an async function into a [`RouteHandler`].
///
/// The function receives its own clone of the request and may return
/// anything that implements [`Responder`].
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut, R>(f: F) -> FnHandler<F>
where
    F: Fn(ServerRequest) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: Responder,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut, R> RouteHandler for FnHandler<F>
where
    F: Fn(ServerRequest) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: Responder,
{
    async fn invoke(
        &self,
        request: &ServerRequest,
        _context: &FlowContext,
        _arguments: &Arguments,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let responder = (self.f)(request.clone()).await;
        Ok(responder.response_to(request))
    }
}
