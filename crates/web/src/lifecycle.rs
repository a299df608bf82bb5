//! The request lifecycle orchestrator.
//!
//! A [`RequestLifecycle`] drives one inbound request from "a route has been
//! matched (or not)" all the way to a terminal response: filter execution,
//! argument fulfillment, handler invocation, status-driven re-routing and
//! multi-tier error recovery. It is the boundary below which failures never
//! propagate — every run resolves to a concrete response, an explicit
//! nothing-to-send signal, or a loud filter-contract failure.
//!
//! One lifecycle instance serves exactly one request and is discarded
//! afterwards; the shared collaborators live in the [`Pipeline`]. Dropping
//! the future returned by the entry points cancels the request end to end,
//! which is how a transport reacts to the peer closing the connection early.

use std::error::Error;
use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http::{Method, Response, StatusCode, header};
use thiserror::Error as ThisError;
use tracing::{debug, error, trace, warn};

use crate::binder::{ArgumentBinder, ImmediateBinder};
use crate::body::ResponseBody;
use crate::config::LifecycleConfig;
use crate::context::FlowContext;
use crate::error::{BoxError, FilterContractViolation, ResponseSuppressed};
use crate::error_response::{ErrorContext, ErrorResponseProcessor, JsonErrorResponseProcessor};
use crate::executor::ExecutorRegistry;
use crate::filter::FilterChain;
use crate::registry::ExceptionHandlers;
use crate::request::ServerRequest;
use crate::route::{MatchedRoute, RouteInfo, RouteMatch};
use crate::router::{Router, StaticResourceResolver};

/// Final outcome of a lifecycle run.
#[derive(Debug)]
pub enum FlowOutcome {
    /// A complete response for the transport to serialize.
    Response(Response<ResponseBody>),
    /// Nothing to send: the failure was ignorable (the peer went away).
    Suppressed,
}

impl FlowOutcome {
    pub fn into_response(self) -> Option<Response<ResponseBody>> {
        match self {
            FlowOutcome::Response(response) => Some(response),
            FlowOutcome::Suppressed => None,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, FlowOutcome::Suppressed)
    }
}

/// Fatal pipeline failures surfaced to the caller of the entry points.
///
/// Application errors never appear here — they resolve to responses inside
/// the run. What does appear is the one failure that must not be masked by
/// a generic error response: a broken filter violating the chain contract.
#[derive(Debug, ThisError)]
pub enum LifecycleError {
    #[error(transparent)]
    FilterContract(#[from] FilterContractViolation),
}

/// The shared, read-mostly collaborator bundle serving many concurrent
/// requests.
pub struct Pipeline {
    pub(crate) router: Arc<dyn Router>,
    pub(crate) binder: Arc<dyn ArgumentBinder>,
    pub(crate) exception_handlers: Arc<ExceptionHandlers>,
    pub(crate) executors: Arc<ExecutorRegistry>,
    pub(crate) error_processor: Arc<dyn ErrorResponseProcessor>,
    pub(crate) static_resources: Option<Arc<dyn StaticResourceResolver>>,
    pub(crate) config: LifecycleConfig,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Creates the lifecycle for one request with its already-made route
    /// match (or none).
    pub fn lifecycle(self: &Arc<Self>, request: ServerRequest, route: Option<RouteMatch>) -> RequestLifecycle {
        RequestLifecycle {
            pipeline: Arc::clone(self),
            route,
            state: LifecycleState { request: Mutex::new(request), context: Mutex::new(FlowContext::new()) },
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("exception_handlers", &self.exception_handlers.len())
            .field("static_resources", &self.static_resources.is_some())
            .finish()
    }
}

#[derive(ThisError, Debug)]
pub enum PipelineBuildError {
    #[error("router must be set")]
    MissingRouter,
}

pub struct PipelineBuilder {
    router: Option<Arc<dyn Router>>,
    binder: Arc<dyn ArgumentBinder>,
    exception_handlers: ExceptionHandlers,
    executors: ExecutorRegistry,
    error_processor: Arc<dyn ErrorResponseProcessor>,
    static_resources: Option<Arc<dyn StaticResourceResolver>>,
    config: LifecycleConfig,
}

impl PipelineBuilder {
    fn new() -> Self {
        Self {
            router: None,
            binder: Arc::new(ImmediateBinder),
            exception_handlers: ExceptionHandlers::default(),
            executors: ExecutorRegistry::new(),
            error_processor: Arc::new(JsonErrorResponseProcessor),
            static_resources: None,
            config: LifecycleConfig::default(),
        }
    }

    pub fn router(mut self, router: impl Router + 'static) -> Self {
        self.router = Some(Arc::new(router));
        self
    }

    pub fn binder(mut self, binder: impl ArgumentBinder + 'static) -> Self {
        self.binder = Arc::new(binder);
        self
    }

    pub fn exception_handlers(mut self, exception_handlers: ExceptionHandlers) -> Self {
        self.exception_handlers = exception_handlers;
        self
    }

    pub fn executors(mut self, executors: ExecutorRegistry) -> Self {
        self.executors = executors;
        self
    }

    pub fn error_processor(mut self, error_processor: impl ErrorResponseProcessor + 'static) -> Self {
        self.error_processor = Arc::new(error_processor);
        self
    }

    pub fn static_resources(mut self, static_resources: impl StaticResourceResolver + 'static) -> Self {
        self.static_resources = Some(Arc::new(static_resources));
        self
    }

    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineBuildError> {
        let router = self.router.ok_or(PipelineBuildError::MissingRouter)?;
        Ok(Pipeline {
            router,
            binder: self.binder,
            exception_handlers: Arc::new(self.exception_handlers),
            executors: Arc::new(self.executors),
            error_processor: self.error_processor,
            static_resources: self.static_resources,
            config: self.config,
        })
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder").field("has_router", &self.router.is_some()).finish()
    }
}

/// Per-request state machine driving one request to a terminal response.
pub struct RequestLifecycle {
    pub(crate) pipeline: Arc<Pipeline>,
    route: Option<RouteMatch>,
    state: LifecycleState,
}

/// Mutable per-request state. Filters substitute the request and establish
/// the ambient context; later steps (the cascade, status routes) read the
/// then-current values from here.
struct LifecycleState {
    request: Mutex<ServerRequest>,
    context: Mutex<FlowContext>,
}

/// What runs at the innermost position of a filter chain.
pub(crate) enum Terminal {
    /// Fulfill arguments, invoke the route, apply status handling; failures
    /// feed the cascade.
    Route(RouteMatch),
    /// Run the error cascade for a cause.
    Error(Mutex<Option<BoxError>>),
    /// A response that is already complete.
    Fixed(Mutex<Option<Response<ResponseBody>>>),
}

impl Terminal {
    pub(crate) fn error(cause: BoxError) -> Self {
        Terminal::Error(Mutex::new(Some(cause)))
    }

    pub(crate) fn fixed(response: Response<ResponseBody>) -> Self {
        Terminal::Fixed(Mutex::new(Some(response)))
    }
}

impl RequestLifecycle {
    /// Executes the request normally.
    pub async fn execute(self) -> Result<FlowOutcome, LifecycleError> {
        let result = self.normal_flow().await;
        self.finish(result)
    }

    /// Resolves an error that occurred outside the normal flow (e.g. while
    /// decoding the request). Filters still run around the error handling,
    /// so cross-cutting headers are applied uniformly.
    pub async fn execute_error(self, cause: BoxError) -> Result<FlowOutcome, LifecycleError> {
        let result = self.run_with_filters(Terminal::error(cause)).await;
        self.finish(result)
    }

    /// The request this lifecycle currently processes. Filters may have
    /// substituted it since construction.
    pub fn request(&self) -> ServerRequest {
        lock(&self.state.request).clone()
    }

    async fn normal_flow(&self) -> Result<Response<ResponseBody>, BoxError> {
        let request = self.request();

        if !self.pipeline.config.multipart_enabled {
            if let Some(content_type) = request.content_type() {
                if content_type.essence_str() == mime::MULTIPART_FORM_DATA.essence_str() {
                    debug!(
                        uri = %request.uri(),
                        method = %request.method(),
                        %content_type,
                        "multipart uploads disabled, rejecting request"
                    );
                    // rejected before any filter runs: this content will
                    // never be processed, so no filter cost is paid for it
                    let message = format!("Content Type [{content_type}] not allowed");
                    let response = plain_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
                    return Ok(self.apply_error_body(response, None, Some(&message)));
                }
            }
        }

        match self.route.clone() {
            None => {
                if let Some(resolver) = &self.pipeline.static_resources {
                    if let Some(body) = resolver.resolve(&request).await {
                        return self.run_with_filters(Terminal::fixed(Response::new(body))).await;
                    }
                }
                self.on_route_miss().await
            }
            Some(route) => {
                request.attributes().insert(MatchedRoute(route.info_arc()));
                trace!(
                    method = %request.method(),
                    path = request.uri().path(),
                    declaring_type = ?route.info().declaring_type(),
                    "matched route"
                );

                if route.info().is_bidi_streaming() {
                    let response = plain_status(StatusCode::BAD_REQUEST);
                    return self
                        .on_status_error(response, "Bidirectional streaming routes are not handled by this pipeline")
                        .await;
                }

                self.run_with_filters(Terminal::Route(route)).await
            }
        }
    }

    /// Runs the request's filters around `terminal`.
    pub(crate) async fn run_with_filters(&self, terminal: Terminal) -> Result<Response<ResponseBody>, BoxError> {
        let request = self.request();
        let filters = self.pipeline.router.find_filters(&request);
        let context = self.context();

        if filters.is_empty() {
            return self.run_terminal(&terminal, context).await;
        }

        let position = AtomicUsize::new(0);
        let chain = FilterChain { lifecycle: self, filters: &filters, position: &position, terminal: &terminal };
        chain.trigger(&filters[0], request, context).await
    }

    pub(crate) async fn run_terminal(
        &self,
        terminal: &Terminal,
        context: FlowContext,
    ) -> Result<Response<ResponseBody>, BoxError> {
        match terminal {
            Terminal::Route(route) => match self.execute_route(route.clone(), context).await {
                Ok(response) => Ok(response),
                Err(cause) => self.on_error_no_filter(cause).await,
            },
            Terminal::Error(slot) => {
                let Some(cause) = lock(slot).take() else {
                    error!("error terminal polled twice, this is a bug");
                    return Ok(fallback_response());
                };
                self.on_error_no_filter(cause).await
            }
            Terminal::Fixed(slot) => {
                let Some(response) = lock(slot).take() else {
                    error!("fixed terminal polled twice, this is a bug");
                    return Ok(fallback_response());
                };
                Ok(response)
            }
        }
    }

    async fn execute_route(
        &self,
        route: RouteMatch,
        context: FlowContext,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let request = self.request();
        let fulfilled = self.pipeline.binder.fulfill(route, &request).await?;
        let response = self.call_route(&context, &fulfilled).await?;
        self.handle_status(response).await
    }

    /// Invokes the handler of a fulfilled route and stamps the response with
    /// the route's metadata.
    pub(crate) async fn call_route(
        &self,
        context: &FlowContext,
        route: &RouteMatch,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let request = self.request();
        let response = route.handler().invoke(&request, context, route.arguments()).await?;
        Ok(finish_route_response(response, route.info_arc()))
    }

    /// Status-driven re-routing: an error-status response from an ordinary
    /// route is replaced by the output of a matching status route, with the
    /// check re-applied to that output. Bounded by `max_status_redirects`
    /// against status routes pointing at each other.
    pub(crate) async fn handle_status(
        &self,
        response: Response<ResponseBody>,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let mut response = response;
        let mut redirects = 0usize;
        loop {
            if response.status().as_u16() < 400 {
                return Ok(response);
            }
            let from_error_route =
                response.extensions().get::<MatchedRoute>().map(|matched| matched.0.is_error_route());
            match from_error_route {
                // untouched responses and error-route output stay as they are
                None | Some(true) => return Ok(response),
                Some(false) => {}
            }

            let request = self.request();
            let Some(status_route) = self.pipeline.router.find_status_route(response.status(), &request) else {
                return Ok(response);
            };

            redirects += 1;
            if redirects > self.pipeline.config.max_status_redirects {
                warn!(status = %response.status(), "status route redirect limit reached, returning response as-is");
                return Ok(response);
            }

            let result = async {
                let fulfilled = self.pipeline.binder.fulfill(status_route, &request).await?;
                // status routes start from a fresh ambient context
                self.call_route(&FlowContext::new(), &fulfilled).await
            }
            .await;

            response = match result {
                Ok(next) => next,
                Err(cause) => self.on_error_no_filter(cause).await?,
            };
        }
    }

    /// Renders an error-status response, preferring a status route when one
    /// is declared; either way the full filter chain runs around the result.
    pub(crate) async fn on_status_error(
        &self,
        response: Response<ResponseBody>,
        message: &str,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let request = self.request();
        if let Some(status_route) = self.pipeline.router.find_status_route(response.status(), &request) {
            return self.run_with_filters(Terminal::Route(status_route)).await;
        }
        let response = self.apply_error_body(response, None, Some(message));
        self.run_with_filters(Terminal::fixed(response)).await
    }

    /// Applies the error-body processor, except for HEAD requests which get
    /// the status line only.
    pub(crate) fn apply_error_body(
        &self,
        response: Response<ResponseBody>,
        cause: Option<&(dyn Error + Send + Sync + 'static)>,
        message: Option<&str>,
    ) -> Response<ResponseBody> {
        let request = self.request();
        if request.method() == Method::HEAD {
            return response;
        }

        let mut error_context = ErrorContext::new(&request);
        if let Some(cause) = cause {
            error_context = error_context.with_cause(cause);
        }
        if let Some(message) = message {
            error_context = error_context.with_message(message);
        }

        let mut response = self.pipeline.error_processor.process(&error_context, response);
        if !response.headers().contains_key(header::CONTENT_TYPE) {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        }
        response
    }

    fn finish(self, result: Result<Response<ResponseBody>, BoxError>) -> Result<FlowOutcome, LifecycleError> {
        match result {
            Ok(response) => Ok(FlowOutcome::Response(response)),
            Err(cause) if cause.is::<ResponseSuppressed>() => Ok(FlowOutcome::Suppressed),
            Err(cause) => match cause.downcast::<FilterContractViolation>() {
                Ok(violation) => Err(LifecycleError::FilterContract(*violation)),
                Err(cause) => {
                    error!(cause = %cause, "request lifecycle escaped error recovery, sending fallback response");
                    Ok(FlowOutcome::Response(fallback_response()))
                }
            },
        }
    }

    pub(crate) fn context(&self) -> FlowContext {
        lock(&self.state.context).clone()
    }

    pub(crate) fn publish_request(&self, request: ServerRequest) {
        *lock(&self.state.request) = request;
    }

    pub(crate) fn publish_context(&self, context: FlowContext) {
        *lock(&self.state.context) = context;
    }
}

impl fmt::Debug for RequestLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLifecycle").field("route", &self.route).finish()
    }
}

/// Attaches route metadata to a response: the matched-route attribute, and
/// a content type defaulted from a single declared produces entry. This is
/// shared by ordinary route invocations and exception-handler results.
pub(crate) fn finish_route_response(
    mut response: Response<ResponseBody>,
    info: Arc<RouteInfo>,
) -> Response<ResponseBody> {
    if !response.headers().contains_key(header::CONTENT_TYPE) {
        if let [media_type] = info.produces() {
            if let Ok(value) = header::HeaderValue::from_str(media_type.as_ref()) {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
        }
    }
    response.extensions_mut().insert(MatchedRoute(info));
    response
}

pub(crate) fn plain_status(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::empty());
    *response.status_mut() = status;
    response
}

/// The degraded response used when even error recovery failed. Fixed
/// content, cannot itself fail, never retried.
fn fallback_response() -> Response<ResponseBody> {
    let mut response = plain_status(StatusCode::INTERNAL_SERVER_ERROR);
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain; charset=utf-8"));
    *response.body_mut() = ResponseBody::from("Internal Server Error");
    response
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
