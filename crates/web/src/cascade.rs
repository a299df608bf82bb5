//! The error resolution cascade.
//!
//! Every application failure in the pipeline funnels through
//! [`RequestLifecycle::on_error_no_filter`]. Resolution attempts run in a
//! fixed order, each attempt's own failure falling through to the default
//! response:
//!
//! 1. unwrap a completion wrapper, one level, to recover the original cause
//! 2. a route-local error route (more specific, always tried first)
//! 3. a globally registered exception handler for the exact cause type
//! 4. ignorable causes produce no response at all
//! 5. the default error response, which cannot fail
//!
//! The two non-application signals — filter contract violations and the
//! suppression sentinel — pass through untouched so they reach the entry
//! points instead of being masked by a 500.

use std::error::Error;
use std::sync::Arc;

use futures::future::BoxFuture;
use http::{Response, StatusCode};
use tracing::{debug, error};

use crate::body::ResponseBody;
use crate::error::{BoxError, CapturedCause, CompletionError, FilterContractViolation, ResponseSuppressed, is_ignorable};
use crate::lifecycle::{RequestLifecycle, finish_route_response, plain_status};
use crate::route::MatchedRoute;

impl RequestLifecycle {
    /// Resolves `cause` to a response without running filters; callers that
    /// need filtered error handling wrap this in a chain run.
    pub(crate) fn on_error_no_filter<'a>(
        &'a self,
        cause: BoxError,
    ) -> BoxFuture<'a, Result<Response<ResponseBody>, BoxError>> {
        Box::pin(async move {
            if cause.is::<FilterContractViolation>() || cause.is::<ResponseSuppressed>() {
                return Err(cause);
            }

            // completion wrappers always hide the real failure; unwrap one
            // level so error-handler matching sees the original type
            let cause = match cause.downcast::<CompletionError>() {
                Ok(wrapper) => wrapper.into_source(),
                Err(original) => original,
            };
            let cause: Arc<dyn Error + Send + Sync> = Arc::from(cause);

            let request = self.request();
            let declaring_type =
                request.attributes().get::<MatchedRoute>().and_then(|matched| matched.0.declaring_type());

            if let Some(error_route) = self.pipeline.router.find_error_route(cause.as_ref(), declaring_type, &request)
            {
                if self.pipeline.config.log_handled_exceptions {
                    error!(cause = %cause, "handling request error with an error route");
                }
                let result = async {
                    let response = self.call_route(&self.context(), &error_route).await?;
                    self.handle_status(response).await
                }
                .await;

                let mut response = match result {
                    Ok(response) => response,
                    Err(inner) if inner.is::<FilterContractViolation>() || inner.is::<ResponseSuppressed>() => {
                        return Err(inner);
                    }
                    Err(inner) => self.default_error_response(inner.as_ref()),
                };
                response.extensions_mut().insert(CapturedCause(Arc::clone(&cause)));
                return Ok(response);
            }

            if let Some((handler, info)) = self.pipeline.exception_handlers.find(cause.as_ref()) {
                if self.pipeline.config.log_handled_exceptions {
                    error!(cause = %cause, handler = ?info.declaring_type(), "handling request error with a registered handler");
                }
                let result = match self.pipeline.executors.select(&info) {
                    Some(executor) => {
                        let handler = Arc::clone(&handler);
                        let request = request.clone();
                        let handler_cause = Arc::clone(&cause);
                        match executor.spawn_blocking(move || handler.handle(&request, handler_cause.as_ref())).await {
                            Ok(result) => result,
                            Err(join_error) => Err(BoxError::from(CompletionError::new(join_error))),
                        }
                    }
                    None => handler.handle(&request, cause.as_ref()),
                };

                return match result {
                    Ok(response) => {
                        let mut response = finish_route_response(response, info);
                        response.extensions_mut().insert(CapturedCause(Arc::clone(&cause)));
                        Ok(response)
                    }
                    Err(inner) => Ok(self.default_error_response(inner.as_ref())),
                };
            }

            if is_ignorable(cause.as_ref()) {
                debug!(cause = %cause, "swallowing ignorable exception, peer closed the connection");
                return Err(ResponseSuppressed.into());
            }

            Ok(self.default_error_response(cause.as_ref()))
        })
    }

    /// The fixed fallback of the cascade: a 500 with a structured error
    /// body. This step has no further fallback and must not fail.
    pub(crate) fn default_error_response(&self, cause: &(dyn Error + Send + Sync + 'static)) -> Response<ResponseBody> {
        error!(cause = %cause, "unexpected error occurred, producing default error response");
        let response = plain_status(StatusCode::INTERNAL_SERVER_ERROR);
        self.apply_error_body(response, Some(cause), None)
    }
}
