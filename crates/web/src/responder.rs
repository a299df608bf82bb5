//! Response conversion for handler results.
//!
//! This module provides the [`Responder`] trait which defines how different
//! types can be converted into HTTP responses. It is the single
//! body-to-response path of the pipeline: ordinary route handlers and
//! exception handlers both produce their responses through it, so content
//! negotiation defaults behave identically for success and error bodies.

use crate::ServerRequest;
use crate::body::ResponseBody;
use bytes::Bytes;
use http::{Response, StatusCode};
use std::convert::Infallible;

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn response_to(self, req: &ServerRequest) -> Response<ResponseBody>;
}

/// Implementation for Result allows handlers to return Result types directly.
/// The Ok and Err variants must both implement Responder.
impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn response_to(self, req: &ServerRequest) -> Response<ResponseBody> {
        match self {
            Ok(t) => t.response_to(req),
            Err(e) => e.response_to(req),
        }
    }
}

/// Implementation for Option allows handlers to return Option types.
/// None case returns an empty response.
impl<T: Responder> Responder for Option<T> {
    fn response_to(self, req: &ServerRequest) -> Response<ResponseBody> {
        match self {
            Some(t) => t.response_to(req),
            None => Response::new(ResponseBody::empty()),
        }
    }
}

/// Implementation for Response allows passing through pre-built responses.
impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn response_to(self, _req: &ServerRequest) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

/// Implementation for (StatusCode, T) tuple allows setting a status code
/// along with the response content.
impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self, req: &ServerRequest) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to(req);
        *response.status_mut() = status;
        response
    }
}

/// Implementation for (T, StatusCode) tuple - same as above but with reversed order.
impl<T: Responder> Responder for (T, StatusCode) {
    fn response_to(self, req: &ServerRequest) -> Response<ResponseBody> {
        let (responder, status) = self;
        (status, responder).response_to(req)
    }
}

/// Implementation for Box<T> allows boxing responders.
impl<T: Responder> Responder for Box<T> {
    fn response_to(self, req: &ServerRequest) -> Response<ResponseBody> {
        (*self).response_to(req)
    }
}

/// Implementation for unit type () returns an empty response.
impl Responder for () {
    fn response_to(self, _req: &ServerRequest) -> Response<ResponseBody> {
        Response::new(ResponseBody::empty())
    }
}

/// Implementation for static strings returns them as plain text responses.
impl Responder for &'static str {
    fn response_to(self, _req: &ServerRequest) -> Response<ResponseBody> {
        text_response(ResponseBody::from(self))
    }
}

/// Implementation for String returns it as a plain text response.
impl Responder for String {
    fn response_to(self, _req: &ServerRequest) -> Response<ResponseBody> {
        text_response(ResponseBody::from(self))
    }
}

/// Implementation for raw bytes returns them as an octet-stream response.
impl Responder for Bytes {
    fn response_to(self, _req: &ServerRequest) -> Response<ResponseBody> {
        let mut response = Response::new(ResponseBody::from(self));
        response
            .headers_mut()
            .insert(http::header::CONTENT_TYPE, mime_value(mime::APPLICATION_OCTET_STREAM.as_ref()));
        response
    }
}

impl Responder for Infallible {
    fn response_to(self, _req: &ServerRequest) -> Response<ResponseBody> {
        unreachable!()
    }
}

fn text_response(body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    response.headers_mut().insert(http::header::CONTENT_TYPE, mime_value(mime::TEXT_PLAIN_UTF_8.as_ref()));
    response
}

fn mime_value(value: &str) -> http::HeaderValue {
    http::HeaderValue::from_str(value).unwrap_or_else(|_| http::HeaderValue::from_static("application/octet-stream"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    fn request() -> ServerRequest {
        ServerRequest::from_header(Request::builder().uri("/").body(()).unwrap().into())
    }

    #[test]
    fn strings_are_plain_text() {
        let response = "hello".response_to(&request());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], mime::TEXT_PLAIN_UTF_8.as_ref());
    }

    #[test]
    fn status_tuple_overrides_status() {
        let response = (StatusCode::CREATED, "made".to_string()).response_to(&request());
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn option_none_is_empty_ok() {
        let response = Option::<String>::None.response_to(&request());
        assert_eq!(response.status(), StatusCode::OK);
        assert!(http_body::Body::is_end_stream(response.body()));
    }

    #[test]
    fn result_picks_the_variant() {
        let ok: Result<&'static str, String> = Ok("fine");
        assert_eq!(ok.response_to(&request()).status(), StatusCode::OK);

        let err: Result<&'static str, (StatusCode, String)> =
            Err((StatusCode::BAD_GATEWAY, "upstream".to_string()));
        assert_eq!(err.response_to(&request()).status(), StatusCode::BAD_GATEWAY);
    }
}
