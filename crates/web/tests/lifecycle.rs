//! End-to-end tests driving full lifecycles through stub collaborators.

use std::collections::HashMap;
use std::error::Error;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::{HeaderValue, Method, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use thiserror::Error;

use weft_http::protocol::RequestHeader;
use weft_web::{
    Arguments, BoxError, CapturedCause, CompletionError, ExceptionHandlers, ExecutorRegistry, FilterChain,
    FlowContext, FlowOutcome, HttpFilter, LifecycleConfig, LifecycleError, Pipeline, ResponseBody, RouteHandler,
    RouteInfo, RouteMatch, Router, ServerRequest, StaticResourceResolver, exception_handler_fn, handler_fn,
};

#[derive(Debug, Error)]
#[error("illegal state: {0}")]
struct IllegalState(&'static str);

#[derive(Debug, Error)]
#[error("status route blew up")]
struct StatusRouteFailure;

#[derive(Default)]
struct StubRouter {
    filters: Vec<Arc<dyn HttpFilter>>,
    error_route: Option<RouteMatch>,
    status_routes: HashMap<u16, RouteMatch>,
    candidates: Vec<Arc<RouteInfo>>,
}

impl Router for StubRouter {
    fn find_filters(&self, _request: &ServerRequest) -> Vec<Arc<dyn HttpFilter>> {
        self.filters.clone()
    }

    fn find_error_route(
        &self,
        _cause: &(dyn Error + Send + Sync + 'static),
        _declaring_type: Option<&'static str>,
        _request: &ServerRequest,
    ) -> Option<RouteMatch> {
        self.error_route.clone()
    }

    fn find_status_route(&self, status: StatusCode, _request: &ServerRequest) -> Option<RouteMatch> {
        self.status_routes.get(&status.as_u16()).cloned()
    }

    fn find_candidates(&self, _path: &str, _request: &ServerRequest) -> Vec<Arc<RouteInfo>> {
        self.candidates.clone()
    }
}

struct FailingHandler {
    make: Box<dyn Fn() -> BoxError + Send + Sync>,
}

impl FailingHandler {
    fn new(make: impl Fn() -> BoxError + Send + Sync + 'static) -> Self {
        Self { make: Box::new(make) }
    }
}

#[async_trait]
impl RouteHandler for FailingHandler {
    async fn invoke(
        &self,
        _request: &ServerRequest,
        _context: &FlowContext,
        _arguments: &Arguments,
    ) -> Result<Response<ResponseBody>, BoxError> {
        Err((self.make)())
    }
}

/// Applies a fixed response header on the way back up the chain.
struct HeaderFilter {
    name: &'static str,
    value: &'static str,
}

#[async_trait]
impl HttpFilter for HeaderFilter {
    async fn filter(
        &self,
        request: ServerRequest,
        context: FlowContext,
        chain: &FilterChain<'_>,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let mut response = chain.proceed(request, context).await?;
        response
            .headers_mut()
            .insert(http::HeaderName::from_static(self.name), HeaderValue::from_static(self.value));
        Ok(response)
    }
}

/// Records its label before continuing.
struct RecordingFilter {
    label: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl HttpFilter for RecordingFilter {
    async fn filter(
        &self,
        request: ServerRequest,
        context: FlowContext,
        chain: &FilterChain<'_>,
    ) -> Result<Response<ResponseBody>, BoxError> {
        self.log.lock().unwrap().push(self.label);
        chain.proceed(request, context).await
    }
}

/// Responds on its own, never continuing the chain.
struct ShortCircuitFilter;

#[async_trait]
impl HttpFilter for ShortCircuitFilter {
    async fn filter(
        &self,
        _request: ServerRequest,
        _context: FlowContext,
        _chain: &FilterChain<'_>,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let mut response = Response::new(ResponseBody::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        Ok(response)
    }
}

/// A broken filter that continues the chain twice.
struct DoubleProceedFilter;

#[async_trait]
impl HttpFilter for DoubleProceedFilter {
    async fn filter(
        &self,
        request: ServerRequest,
        context: FlowContext,
        chain: &FilterChain<'_>,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let first = chain.proceed(request.clone(), context.clone()).await?;
        let _second = chain.proceed(request, context).await?;
        Ok(first)
    }
}

fn get_request(uri: &str) -> ServerRequest {
    request(Request::builder().method(Method::GET).uri(uri))
}

fn request(builder: http::request::Builder) -> ServerRequest {
    let header: RequestHeader = builder.body(()).unwrap().into();
    ServerRequest::from_header(header)
}

fn text_route(body: &'static str) -> RouteMatch {
    RouteMatch::new(
        RouteInfo::builder().method(Method::GET).build(),
        Arc::new(handler_fn(move |_request: ServerRequest| async move { body })),
    )
}

fn failing_route(make: impl Fn() -> BoxError + Send + Sync + 'static) -> RouteMatch {
    RouteMatch::new(RouteInfo::builder().method(Method::GET).build(), Arc::new(FailingHandler::new(make)))
}

fn pipeline(router: StubRouter) -> Arc<Pipeline> {
    Arc::new(Pipeline::builder().router(router).build().unwrap())
}

async fn body_string(response: Response<ResponseBody>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn expect_response(outcome: FlowOutcome) -> Response<ResponseBody> {
    outcome.into_response().expect("expected a response outcome")
}

#[tokio::test]
async fn handler_response_reaches_the_caller() {
    let pipeline = pipeline(StubRouter::default());
    let outcome = pipeline.lifecycle(get_request("/hello"), Some(text_route("hello world"))).execute().await.unwrap();

    let response = expect_response(outcome);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "hello world");
}

#[tokio::test]
async fn route_miss_for_other_method_lists_allowed_methods() {
    let router = StubRouter {
        candidates: vec![Arc::new(RouteInfo::builder().method(Method::PUT).build())],
        ..StubRouter::default()
    };
    let pipeline = pipeline(router);

    let outcome = pipeline.lifecycle(get_request("/foo"), None).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "PUT");

    let body = body_string(response).await;
    assert!(body.contains("Method [GET] not allowed"), "unexpected body: {body}");
    assert!(body.contains("PUT"), "unexpected body: {body}");
}

#[tokio::test]
async fn global_handler_resolves_thrown_error_and_attaches_cause() {
    let handlers = ExceptionHandlers::builder()
        .register::<IllegalState, _>(exception_handler_fn(|_request: &ServerRequest, cause: &IllegalState| {
            (StatusCode::CONFLICT, format!("recovered from {cause}"))
        }))
        .build();
    let pipeline =
        Arc::new(Pipeline::builder().router(StubRouter::default()).exception_handlers(handlers).build().unwrap());

    let route = failing_route(|| IllegalState("boom").into());
    let outcome = pipeline.lifecycle(get_request("/fail"), Some(route)).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let captured = response.extensions().get::<CapturedCause>().expect("cause attribute");
    assert!(captured.0.downcast_ref::<IllegalState>().is_some());

    assert_eq!(body_string(response).await, "recovered from illegal state: boom");
}

#[tokio::test]
async fn double_continuation_fails_the_run_loudly() {
    let router = StubRouter { filters: vec![Arc::new(DoubleProceedFilter)], ..StubRouter::default() };
    let pipeline = pipeline(router);

    let result = pipeline.lifecycle(get_request("/"), Some(text_route("never"))).execute().await;
    let LifecycleError::FilterContract(violation) = result.unwrap_err();
    assert_eq!(violation.position(), 2);
    assert_eq!(violation.length(), 1);
}

#[tokio::test]
async fn error_recovery_happens_inside_the_filter_wrapping() {
    let router = StubRouter {
        filters: vec![Arc::new(HeaderFilter { name: "access-control-allow-origin", value: "*" })],
        ..StubRouter::default()
    };
    let pipeline = pipeline(router);

    let route = failing_route(|| IllegalState("unhandled").into());
    let outcome = pipeline.lifecycle(get_request("/fail"), Some(route)).execute().await.unwrap();
    let response = expect_response(outcome);

    // the cascade ran inside the chain, so the filter still decorated the
    // default error response
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()[header::CONTENT_TYPE], mime::APPLICATION_JSON.as_ref());
}

#[tokio::test]
async fn disabled_multipart_is_rejected_before_filters_run() {
    let filter_ran = Arc::new(AtomicBool::new(false));
    let log = Arc::new(Mutex::new(Vec::new()));

    struct MarkerFilter {
        ran: Arc<AtomicBool>,
    }

    #[async_trait]
    impl HttpFilter for MarkerFilter {
        async fn filter(
            &self,
            request: ServerRequest,
            context: FlowContext,
            chain: &FilterChain<'_>,
        ) -> Result<Response<ResponseBody>, BoxError> {
            self.ran.store(true, Ordering::SeqCst);
            chain.proceed(request, context).await
        }
    }

    let router = StubRouter {
        filters: vec![Arc::new(MarkerFilter { ran: Arc::clone(&filter_ran) })],
        ..StubRouter::default()
    };
    let config: LifecycleConfig = serde_json::from_str(r#"{"multipart_enabled": false}"#).unwrap();
    let pipeline = Arc::new(Pipeline::builder().router(router).config(config).build().unwrap());

    let request = request(
        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=xyz"),
    );
    let recording_route = RouteMatch::new(
        RouteInfo::builder().method(Method::POST).build(),
        Arc::new(RecordingHandler { log: Arc::clone(&log) }),
    );

    let outcome = pipeline.lifecycle(request, Some(recording_route)).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(!filter_ran.load(Ordering::SeqCst), "filters must not run for this short-circuit");
    assert!(log.lock().unwrap().is_empty(), "the handler must not run either");

    let body = body_string(response).await;
    assert!(body.contains("multipart/form-data"), "unexpected body: {body}");
}

struct RecordingHandler {
    log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl RouteHandler for RecordingHandler {
    async fn invoke(
        &self,
        _request: &ServerRequest,
        _context: &FlowContext,
        _arguments: &Arguments,
    ) -> Result<Response<ResponseBody>, BoxError> {
        self.log.lock().unwrap().push("handler");
        Ok(Response::new(ResponseBody::from("recorded")))
    }
}

#[tokio::test]
async fn route_local_error_route_wins_over_global_handler() {
    let global_invoked = Arc::new(AtomicBool::new(false));
    let invoked = Arc::clone(&global_invoked);

    let handlers = ExceptionHandlers::builder()
        .register::<IllegalState, _>(exception_handler_fn(move |_request: &ServerRequest, _cause: &IllegalState| {
            invoked.store(true, Ordering::SeqCst);
            (StatusCode::INTERNAL_SERVER_ERROR, "global")
        }))
        .build();

    let error_route = RouteMatch::new(
        RouteInfo::builder().error_route(true).declaring_type("tests::Controller").build(),
        Arc::new(handler_fn(|_request: ServerRequest| async { (StatusCode::UNPROCESSABLE_ENTITY, "local") })),
    );
    let router = StubRouter { error_route: Some(error_route), ..StubRouter::default() };
    let pipeline = Arc::new(Pipeline::builder().router(router).exception_handlers(handlers).build().unwrap());

    let route = failing_route(|| IllegalState("boom").into());
    let outcome = pipeline.lifecycle(get_request("/fail"), Some(route)).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_string(response).await, "local");
    assert!(!global_invoked.load(Ordering::SeqCst), "the global handler must never be invoked");
}

#[tokio::test]
async fn content_type_mismatch_diagnosed_before_method_mismatch() {
    let router = StubRouter {
        candidates: vec![Arc::new(
            RouteInfo::builder().method(Method::PUT).consumes(mime::APPLICATION_JSON).build(),
        )],
        ..StubRouter::default()
    };
    let pipeline = pipeline(router);

    let request =
        request(Request::builder().method(Method::GET).uri("/foo").header(header::CONTENT_TYPE, "text/plain"));
    let outcome = pipeline.lifecycle(request, None).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn accept_mismatch_produces_not_acceptable() {
    let router = StubRouter {
        candidates: vec![Arc::new(
            RouteInfo::builder().method(Method::GET).produces(mime::APPLICATION_JSON).build(),
        )],
        ..StubRouter::default()
    };
    let pipeline = pipeline(router);

    let request =
        request(Request::builder().method(Method::GET).uri("/foo").header(header::ACCEPT, "application/xml"));
    let outcome = pipeline.lifecycle(request, None).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    let body = body_string(response).await;
    assert!(body.contains("application/json"), "unexpected body: {body}");
}

#[tokio::test]
async fn status_route_replaces_error_status_and_terminates() {
    let friendly = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).build(),
        Arc::new(handler_fn(|_request: ServerRequest| async { "friendly not-found page" })),
    );
    let router = StubRouter { status_routes: HashMap::from([(404, friendly)]), ..StubRouter::default() };
    let pipeline = pipeline(router);

    let route = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).build(),
        Arc::new(handler_fn(|_request: ServerRequest| async { (StatusCode::NOT_FOUND, "raw 404") })),
    );
    let outcome = pipeline.lifecycle(get_request("/lookup"), Some(route)).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "friendly not-found page");
}

#[tokio::test]
async fn failing_status_route_enters_the_cascade() {
    let broken = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).build(),
        Arc::new(FailingHandler::new(|| StatusRouteFailure.into())),
    );
    let router = StubRouter { status_routes: HashMap::from([(404, broken)]), ..StubRouter::default() };
    let pipeline = pipeline(router);

    let route = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).build(),
        Arc::new(handler_fn(|_request: ServerRequest| async { (StatusCode::NOT_FOUND, "raw 404") })),
    );
    let outcome = pipeline.lifecycle(get_request("/lookup"), Some(route)).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(body.contains("status route blew up"), "unexpected body: {body}");
}

#[tokio::test]
async fn self_referencing_status_route_is_bounded() {
    let looping = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).build(),
        Arc::new(handler_fn(|_request: ServerRequest| async {
            (StatusCode::INTERNAL_SERVER_ERROR, "still broken")
        })),
    );
    let router = StubRouter { status_routes: HashMap::from([(500, looping)]), ..StubRouter::default() };
    let pipeline = pipeline(router);

    let route = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).build(),
        Arc::new(handler_fn(|_request: ServerRequest| async { (StatusCode::INTERNAL_SERVER_ERROR, "first") })),
    );

    // must terminate despite the status route reproducing its own status
    let outcome = pipeline.lifecycle(get_request("/loop"), Some(route)).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "still broken");
}

#[tokio::test]
async fn filters_execute_in_declared_order_before_the_terminal() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let router = StubRouter {
        filters: vec![
            Arc::new(RecordingFilter { label: "first", log: Arc::clone(&log) }),
            Arc::new(RecordingFilter { label: "second", log: Arc::clone(&log) }),
        ],
        ..StubRouter::default()
    };
    let pipeline = pipeline(router);

    let route = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).build(),
        Arc::new(RecordingHandler { log: Arc::clone(&log) }),
    );
    pipeline.lifecycle(get_request("/"), Some(route)).execute().await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "handler"]);
}

#[tokio::test]
async fn short_circuit_suppresses_downstream_filters_and_handler() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let router = StubRouter {
        filters: vec![
            Arc::new(RecordingFilter { label: "outer", log: Arc::clone(&log) }),
            Arc::new(ShortCircuitFilter),
            Arc::new(RecordingFilter { label: "inner", log: Arc::clone(&log) }),
        ],
        ..StubRouter::default()
    };
    let pipeline = pipeline(router);

    let route = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).build(),
        Arc::new(RecordingHandler { log: Arc::clone(&log) }),
    );
    let outcome = pipeline.lifecycle(get_request("/"), Some(route)).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(*log.lock().unwrap(), vec!["outer"]);
}

#[tokio::test]
async fn ignorable_cause_suppresses_the_response() {
    let pipeline = pipeline(StubRouter::default());
    let route = failing_route(|| io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer").into());

    let outcome = pipeline.lifecycle(get_request("/gone"), Some(route)).execute().await.unwrap();
    assert!(outcome.is_suppressed());
}

#[tokio::test]
async fn completion_wrapper_is_unwrapped_before_handler_lookup() {
    let handlers = ExceptionHandlers::builder()
        .register::<IllegalState, _>(exception_handler_fn(|_request: &ServerRequest, _cause: &IllegalState| {
            (StatusCode::CONFLICT, "unwrapped")
        }))
        .build();
    let pipeline =
        Arc::new(Pipeline::builder().router(StubRouter::default()).exception_handlers(handlers).build().unwrap());

    let route = failing_route(|| CompletionError::new(IllegalState("wrapped")).into());
    let outcome = pipeline.lifecycle(get_request("/fail"), Some(route)).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let captured = response.extensions().get::<CapturedCause>().expect("cause attribute");
    assert!(captured.0.downcast_ref::<IllegalState>().is_some(), "inner cause must be attached, not the wrapper");
}

#[tokio::test]
async fn error_flow_runs_the_filters_around_the_cascade() {
    let router = StubRouter {
        filters: vec![Arc::new(HeaderFilter { name: "access-control-allow-origin", value: "*" })],
        ..StubRouter::default()
    };
    let pipeline = pipeline(router);

    let outcome = pipeline
        .lifecycle(get_request("/decode-failed"), None)
        .execute_error(IllegalState("bad request line").into())
        .await
        .unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn static_resource_is_served_through_the_filters() {
    struct FixedResource;

    #[async_trait]
    impl StaticResourceResolver for FixedResource {
        async fn resolve(&self, request: &ServerRequest) -> Option<ResponseBody> {
            (request.uri().path() == "/index.html").then(|| ResponseBody::from("<html>home</html>"))
        }
    }

    let router = StubRouter {
        filters: vec![Arc::new(HeaderFilter { name: "x-static", value: "yes" })],
        ..StubRouter::default()
    };
    let pipeline =
        Arc::new(Pipeline::builder().router(router).static_resources(FixedResource).build().unwrap());

    let outcome = pipeline.lifecycle(get_request("/index.html"), None).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-static"], "yes");
    assert_eq!(body_string(response).await, "<html>home</html>");
}

#[tokio::test]
async fn bidi_streaming_routes_are_rejected() {
    let pipeline = pipeline(StubRouter::default());
    let route = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).bidi_streaming(true).build(),
        Arc::new(handler_fn(|_request: ServerRequest| async { "never" })),
    );

    let outcome = pipeline.lifecycle(get_request("/stream"), Some(route)).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("Bidirectional streaming"), "unexpected body: {body}");
}

#[tokio::test]
async fn head_request_error_bodies_are_suppressed() {
    let pipeline = pipeline(StubRouter::default());
    let request = request(Request::builder().method(Method::HEAD).uri("/missing"));

    let outcome = pipeline.lifecycle(request, None).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "");
}

#[tokio::test]
async fn blocking_handler_is_offloaded_to_the_designated_executor() {
    let mut executors = ExecutorRegistry::new();
    executors.register("blocking", tokio::runtime::Handle::current());

    let info = RouteInfo::synthetic_handler("tests::BlockingHandler").executor("blocking").build();
    let handlers = ExceptionHandlers::builder()
        .register_with::<IllegalState, _>(
            exception_handler_fn(|_request: &ServerRequest, _cause: &IllegalState| {
                (StatusCode::SERVICE_UNAVAILABLE, "handled on the blocking pool")
            }),
            info,
        )
        .build();
    let pipeline = Arc::new(
        Pipeline::builder()
            .router(StubRouter::default())
            .exception_handlers(handlers)
            .executors(executors)
            .build()
            .unwrap(),
    );

    let route = failing_route(|| IllegalState("needs offload").into());
    let outcome = pipeline.lifecycle(get_request("/fail"), Some(route)).execute().await.unwrap();
    let response = expect_response(outcome);

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_string(response).await, "handled on the blocking pool");
}

#[tokio::test]
async fn substituted_request_is_the_one_the_handler_sees() {
    struct RewriteFilter;

    #[async_trait]
    impl HttpFilter for RewriteFilter {
        async fn filter(
            &self,
            request: ServerRequest,
            context: FlowContext,
            chain: &FilterChain<'_>,
        ) -> Result<Response<ResponseBody>, BoxError> {
            let rewritten: RequestHeader = Request::builder()
                .method(request.method().clone())
                .uri("/rewritten")
                .body(())
                .unwrap()
                .into();
            chain.proceed(request.with_header(rewritten), context).await
        }
    }

    let router = StubRouter { filters: vec![Arc::new(RewriteFilter)], ..StubRouter::default() };
    let pipeline = pipeline(router);

    let route = RouteMatch::new(
        RouteInfo::builder().method(Method::GET).build(),
        Arc::new(handler_fn(|request: ServerRequest| async move { request.uri().path().to_string() })),
    );
    let outcome = pipeline.lifecycle(get_request("/original"), Some(route)).execute().await.unwrap();

    assert_eq!(body_string(expect_response(outcome)).await, "/rewritten");
}

#[tokio::test]
async fn context_established_by_the_last_filter_reaches_the_handler() {
    #[derive(Debug, Clone, PartialEq)]
    struct TraceId(&'static str);

    struct TracingFilter;

    #[async_trait]
    impl HttpFilter for TracingFilter {
        async fn filter(
            &self,
            request: ServerRequest,
            context: FlowContext,
            chain: &FilterChain<'_>,
        ) -> Result<Response<ResponseBody>, BoxError> {
            chain.proceed(request, context.with(TraceId("trace-77"))).await
        }
    }

    struct ContextEchoHandler;

    #[async_trait]
    impl RouteHandler for ContextEchoHandler {
        async fn invoke(
            &self,
            _request: &ServerRequest,
            context: &FlowContext,
            _arguments: &Arguments,
        ) -> Result<Response<ResponseBody>, BoxError> {
            let trace = context.get::<TraceId>().map_or("missing", |trace| trace.0);
            Ok(Response::new(ResponseBody::from(trace.to_string())))
        }
    }

    let router = StubRouter { filters: vec![Arc::new(TracingFilter)], ..StubRouter::default() };
    let pipeline = pipeline(router);

    let route = RouteMatch::new(RouteInfo::builder().method(Method::GET).build(), Arc::new(ContextEchoHandler));
    let outcome = pipeline.lifecycle(get_request("/traced"), Some(route)).execute().await.unwrap();

    assert_eq!(body_string(expect_response(outcome)).await, "trace-77");
}
