//! Structured error response bodies.

use std::error::Error;
use std::fmt;

use http::{Response, header};
use serde::Serialize;

use crate::body::ResponseBody;
use crate::request::ServerRequest;

/// Everything known about the failure when an error body is rendered.
pub struct ErrorContext<'a> {
    request: &'a ServerRequest,
    cause: Option<&'a (dyn Error + Send + Sync + 'static)>,
    message: Option<&'a str>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(request: &'a ServerRequest) -> Self {
        Self { request, cause: None, message: None }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: &'a (dyn Error + Send + Sync + 'static)) -> Self {
        self.cause = Some(cause);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: &'a str) -> Self {
        self.message = Some(message);
        self
    }

    pub fn request(&self) -> &ServerRequest {
        self.request
    }

    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause
    }

    pub fn message(&self) -> Option<&str> {
        self.message
    }
}

impl fmt::Debug for ErrorContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorContext")
            .field("uri", &self.request.uri())
            .field("message", &self.message)
            .field("has_cause", &self.cause.is_some())
            .finish()
    }
}

/// Renders an error body onto a status-bearing response.
///
/// Implementations must not fail: this runs at the very bottom of the error
/// cascade, where there is nothing left to fall back to.
pub trait ErrorResponseProcessor: Send + Sync {
    fn process(&self, context: &ErrorContext<'_>, response: Response<ResponseBody>) -> Response<ResponseBody>;
}

/// Default processor producing a small JSON error document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorResponseProcessor;

#[derive(Serialize)]
struct ErrorDocument<'a> {
    message: &'a str,
    error: Option<&'a str>,
    path: &'a str,
}

impl ErrorResponseProcessor for JsonErrorResponseProcessor {
    fn process(&self, context: &ErrorContext<'_>, response: Response<ResponseBody>) -> Response<ResponseBody> {
        let cause_message = context.cause().map(|cause| cause.to_string());
        let message = context
            .message()
            .map(|message| message.to_string())
            .or(cause_message)
            .unwrap_or_else(|| "Internal Server Error".to_string());

        let document = ErrorDocument {
            message: &message,
            error: response.status().canonical_reason(),
            path: context.request().uri().path(),
        };
        let body = serde_json::to_vec(&document)
            .unwrap_or_else(|_| br#"{"message":"Internal Server Error"}"#.to_vec());

        let (mut parts, _) = response.into_parts();
        parts.headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        Response::from_parts(parts, ResponseBody::from(body))
    }
}
