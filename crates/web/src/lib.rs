//! An asynchronous HTTP request lifecycle engine.
//!
//! weft-web drives a single inbound request — with its route match already
//! made, or absent — through filter execution, argument fulfillment, handler
//! invocation, status-driven re-routing and multi-tier error recovery to a
//! final response. It owns the control flow only: routing, argument binding,
//! static resources and the transport are collaborators behind traits.
//!
//! # Guarantees
//!
//! - Every run of [`RequestLifecycle::execute`] or
//!   [`RequestLifecycle::execute_error`] resolves to a well-formed response
//!   or an explicit nothing-to-send outcome; application errors never
//!   propagate past the lifecycle.
//! - Filters run in declaration order; each one may continue the chain at
//!   most once. A second continuation fails that run loudly instead of
//!   corrupting another request.
//! - Error and status handling re-run inside the same filter wrapping, so
//!   cross-cutting response headers appear on error responses too.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use weft_web::{handler_fn, FlowOutcome, Pipeline, RouteInfo, RouteMatch, ServerRequest};
//! # use std::error::Error;
//! # use http::StatusCode;
//! # struct MyRouter;
//! # impl weft_web::Router for MyRouter {
//! #     fn find_filters(&self, _r: &ServerRequest) -> Vec<Arc<dyn weft_web::HttpFilter>> { Vec::new() }
//! #     fn find_error_route(&self, _c: &(dyn Error + Send + Sync + 'static), _d: Option<&'static str>, _r: &ServerRequest) -> Option<RouteMatch> { None }
//! #     fn find_status_route(&self, _s: StatusCode, _r: &ServerRequest) -> Option<RouteMatch> { None }
//! #     fn find_candidates(&self, _p: &str, _r: &ServerRequest) -> Vec<Arc<RouteInfo>> { Vec::new() }
//! # }
//!
//! # async fn run() {
//! let pipeline = Arc::new(Pipeline::builder().router(MyRouter).build().unwrap());
//!
//! let request = ServerRequest::from_header(
//!     http::Request::builder().uri("/hello").body(()).unwrap().into(),
//! );
//! let route = RouteMatch::new(
//!     RouteInfo::builder().method(http::Method::GET).build(),
//!     Arc::new(handler_fn(|_req: ServerRequest| async { "hello world" })),
//! );
//!
//! match pipeline.lifecycle(request, Some(route)).execute().await.unwrap() {
//!     FlowOutcome::Response(response) => assert_eq!(response.status(), 200),
//!     FlowOutcome::Suppressed => unreachable!("nothing ignorable happened"),
//! }
//! # }
//! ```

mod arguments;
mod attributes;
mod binder;
mod body;
mod cascade;
mod config;
mod context;
mod error;
mod error_response;
mod executor;
mod filter;
mod handler;
mod lifecycle;
mod registry;
mod request;
mod responder;
mod route;
mod route_miss;
mod router;

pub use arguments::Arguments;
pub use attributes::Attributes;
pub use binder::{ArgumentBinder, ImmediateBinder};
pub use body::{OptionReqBody, ResponseBody};
pub use config::LifecycleConfig;
pub use context::FlowContext;
pub use error::{
    BoxError, CapturedCause, CompletionError, FilterContractViolation, ResponseSuppressed, is_ignorable,
};
pub use error_response::{ErrorContext, ErrorResponseProcessor, JsonErrorResponseProcessor};
pub use executor::ExecutorRegistry;
pub use filter::{FilterChain, HttpFilter};
pub use handler::{FnHandler, RouteHandler, handler_fn};
pub use lifecycle::{
    FlowOutcome, LifecycleError, Pipeline, PipelineBuildError, PipelineBuilder, RequestLifecycle,
};
pub use registry::{
    ExceptionHandler, ExceptionHandlers, ExceptionHandlersBuilder, FnExceptionHandler, exception_handler_fn,
};
pub use request::ServerRequest;
pub use responder::Responder;
pub use route::{MatchedRoute, RouteInfo, RouteInfoBuilder, RouteKind, RouteMatch};
pub use router::{Router, StaticResourceResolver};
