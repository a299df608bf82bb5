//! Minimal wiring of a pipeline with a hand-rolled router.
//!
//! Run with: cargo run --example lifecycle

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use weft_http::protocol::RequestHeader;
use weft_web::{
    Arguments, BoxError, ExceptionHandlers, FilterChain, FlowContext, FlowOutcome, HttpFilter, Pipeline,
    ResponseBody, RouteHandler, RouteInfo, RouteMatch, Router, ServerRequest, exception_handler_fn, handler_fn,
};

/// A router with a single route and a single filter, enough to watch the
/// lifecycle do its job.
struct DemoRouter {
    hello: RouteMatch,
}

impl Router for DemoRouter {
    fn find_filters(&self, _request: &ServerRequest) -> Vec<Arc<dyn HttpFilter>> {
        vec![Arc::new(ServerHeaderFilter)]
    }

    fn find_error_route(
        &self,
        _cause: &(dyn Error + Send + Sync + 'static),
        _declaring_type: Option<&'static str>,
        _request: &ServerRequest,
    ) -> Option<RouteMatch> {
        None
    }

    fn find_status_route(&self, _status: StatusCode, _request: &ServerRequest) -> Option<RouteMatch> {
        None
    }

    fn find_candidates(&self, path: &str, _request: &ServerRequest) -> Vec<Arc<RouteInfo>> {
        if path == "/hello" { vec![self.hello.info_arc()] } else { Vec::new() }
    }
}

struct ServerHeaderFilter;

#[async_trait]
impl HttpFilter for ServerHeaderFilter {
    async fn filter(
        &self,
        request: ServerRequest,
        context: FlowContext,
        chain: &FilterChain<'_>,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let mut response = chain.proceed(request, context).await?;
        response.headers_mut().insert(http::header::SERVER, http::HeaderValue::from_static("weft"));
        Ok(response)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("the teapot is busy")]
struct TeapotBusy;

struct BusyHandler;

#[async_trait]
impl RouteHandler for BusyHandler {
    async fn invoke(
        &self,
        _request: &ServerRequest,
        _context: &FlowContext,
        _arguments: &Arguments,
    ) -> Result<Response<ResponseBody>, BoxError> {
        Err(TeapotBusy.into())
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let hello = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).declaring_type("demo::Hello").build(),
        Arc::new(handler_fn(|request: ServerRequest| async move {
            format!("hello from {}\n", request.uri().path())
        })),
    );

    let handlers = ExceptionHandlers::builder()
        .register::<TeapotBusy, _>(exception_handler_fn(|_request: &ServerRequest, cause: &TeapotBusy| {
            (StatusCode::IM_A_TEAPOT, format!("{cause}\n"))
        }))
        .build();

    let pipeline = Arc::new(
        Pipeline::builder()
            .router(DemoRouter { hello: hello.clone() })
            .exception_handlers(handlers)
            .build()
            .expect("pipeline wiring"),
    );

    // a matched request
    let request = ServerRequest::from_header(parse("/hello"));
    show("GET /hello", pipeline.lifecycle(request, Some(hello.clone())).execute().await.unwrap()).await;

    // no route matched: the miss resolver diagnoses it
    let request = ServerRequest::from_header(parse("/nowhere"));
    show("GET /nowhere", pipeline.lifecycle(request, None).execute().await.unwrap()).await;

    // a failure resolved by the registered handler
    let request = ServerRequest::from_header(parse("/hello"));
    let failing = RouteMatch::new(RouteInfo::builder().method(Method::GET).build(), Arc::new(BusyHandler));
    show("GET /hello (failing)", pipeline.lifecycle(request, Some(failing)).execute().await.unwrap()).await;
}

fn parse(uri: &str) -> RequestHeader {
    Request::builder().method(Method::GET).uri(uri).body(()).unwrap().into()
}

async fn show(label: &str, outcome: FlowOutcome) {
    match outcome {
        FlowOutcome::Response(response) => {
            let status = response.status();
            let server = response.headers().get(http::header::SERVER).is_some();
            let body = response.into_body().collect().await.unwrap().to_bytes();
            info!(%status, server_header = server, body = %String::from_utf8_lossy(&body), "{label}");
        }
        FlowOutcome::Suppressed => info!("{label}: suppressed, nothing to send"),
    }
}
