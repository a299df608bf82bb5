//! Collaborator interfaces for route resolution.
//!
//! The pipeline never matches URIs itself: the primary route match is made
//! before a lifecycle is constructed, and everything else it needs during
//! processing — ancillary routes, the filter list, path-only candidates for
//! diagnosing a miss — comes through the [`Router`] trait.

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;

use crate::body::ResponseBody;
use crate::filter::HttpFilter;
use crate::request::ServerRequest;
use crate::route::{RouteInfo, RouteMatch};

/// Route lookup as consumed by the pipeline.
///
/// Implementations are read-mostly shared singletons; lookups must be cheap
/// and non-blocking, they are called on the request path without offloading.
pub trait Router: Send + Sync {
    /// The filters that apply to this request, in execution order.
    fn find_filters(&self, request: &ServerRequest) -> Vec<Arc<dyn HttpFilter>>;

    /// An error route matching the cause, scoped to the declaring type of
    /// the route that failed (if any). Bound arguments, including the cause,
    /// are the router's responsibility.
    fn find_error_route(
        &self,
        cause: &(dyn Error + Send + Sync + 'static),
        declaring_type: Option<&'static str>,
        request: &ServerRequest,
    ) -> Option<RouteMatch>;

    /// A route declared for the given HTTP status code.
    fn find_status_route(&self, status: StatusCode, request: &ServerRequest) -> Option<RouteMatch>;

    /// Every route whose URI pattern matches the path, regardless of
    /// method, consumed or produced media types. Used to diagnose misses.
    fn find_candidates(&self, path: &str, request: &ServerRequest) -> Vec<Arc<RouteInfo>>;
}

/// Optional static-resource fallback consulted when no route matched.
#[async_trait]
pub trait StaticResourceResolver: Send + Sync {
    /// The resource body for this request, or `None` if there is none.
    async fn resolve(&self, request: &ServerRequest) -> Option<ResponseBody>;
}
