//! Argument fulfillment interface.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::BoxError;
use crate::request::ServerRequest;
use crate::route::RouteMatch;

/// Extracts and converts handler parameters from the request.
///
/// Fulfillment runs inside the filter chain, immediately before the handler
/// is invoked, and may suspend while waiting for request body bytes. The
/// binder returns the match with its arguments replaced by the fulfilled
/// set; a binding failure is an application error and feeds the cascade.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArgumentBinder: Send + Sync {
    async fn fulfill(&self, route: RouteMatch, request: &ServerRequest) -> Result<RouteMatch, BoxError>;
}

/// Binder for handlers that bind lazily.
///
/// Handlers built with [`handler_fn`](crate::handler_fn) read whatever they
/// need from the request themselves, so there is nothing to fulfill up
/// front; this binder returns the match unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateBinder;

#[async_trait]
impl ArgumentBinder for ImmediateBinder {
    async fn fulfill(&self, route: RouteMatch, _request: &ServerRequest) -> Result<RouteMatch, BoxError> {
        Ok(route)
    }
}
