//! The filter chain runner.
//!
//! Filters are the middleware units of the pipeline: each one receives the
//! current request and a continuation bound to its own chain position, and
//! produces a response either by continuing downstream or by
//! short-circuiting with its own response.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use http::Response;

use crate::body::ResponseBody;
use crate::context::FlowContext;
use crate::error::{BoxError, FilterContractViolation};
use crate::lifecycle::{RequestLifecycle, Terminal};
use crate::request::ServerRequest;

/// A middleware unit in the request pipeline.
///
/// A filter may substitute the request it passes downstream (e.g. wrap the
/// body), enrich the ambient [`FlowContext`], post-process the response
/// coming back up, or short-circuit by not calling the continuation at all.
/// The continuation must be invoked **at most once**; a second invocation is
/// a programming error that fails the whole chain run.
///
/// Failures returned by a filter do not crash the pipeline: they are
/// redirected into the error resolution cascade exactly where they occur,
/// so filters further out observe the recovered response.
#[async_trait]
pub trait HttpFilter: Send + Sync {
    async fn filter(
        &self,
        request: ServerRequest,
        context: FlowContext,
        chain: &FilterChain<'_>,
    ) -> Result<Response<ResponseBody>, BoxError>;
}

/// Continuation handle passed to each filter.
///
/// One `FilterChain` serves a single chain run: the position token is scoped
/// to the run, so a misbehaving filter can only fail its own request.
pub struct FilterChain<'a> {
    pub(crate) lifecycle: &'a RequestLifecycle,
    pub(crate) filters: &'a [Arc<dyn HttpFilter>],
    pub(crate) position: &'a AtomicUsize,
    pub(crate) terminal: &'a Terminal,
}

impl FilterChain<'_> {
    /// Continues processing with the next filter, or the terminal step once
    /// the chain is exhausted.
    ///
    /// The request passed here becomes the pipeline's current request; the
    /// context snapshot passed by the last filter is the one the terminal
    /// step observes. Invoking `proceed` more than once from the same filter
    /// execution yields a [`FilterContractViolation`].
    pub async fn proceed(
        &self,
        request: ServerRequest,
        context: FlowContext,
    ) -> Result<Response<ResponseBody>, BoxError> {
        let position = self.position.fetch_add(1, Ordering::SeqCst) + 1;
        let length = self.filters.len();
        if position > length {
            return Err(FilterContractViolation::new(position, length).into());
        }

        self.lifecycle.publish_request(request.clone());
        if position == length {
            self.lifecycle.publish_context(context.clone());
            return self.lifecycle.run_terminal(self.terminal, context).await;
        }
        self.trigger(&self.filters[position], request, context).await
    }

    /// Invokes one filter, wiring its outcome into status handling and the
    /// error cascade.
    pub(crate) async fn trigger(
        &self,
        filter: &Arc<dyn HttpFilter>,
        request: ServerRequest,
        context: FlowContext,
    ) -> Result<Response<ResponseBody>, BoxError> {
        match filter.filter(request, context, self).await {
            Ok(response) => self.lifecycle.handle_status(response).await,
            Err(cause) => self.lifecycle.on_error_no_filter(cause).await,
        }
    }
}

impl fmt::Debug for FilterChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("length", &self.filters.len())
            .field("position", &self.position.load(Ordering::SeqCst))
            .finish()
    }
}
