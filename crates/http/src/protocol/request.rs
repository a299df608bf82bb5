//! HTTP request header handling implementation.
//!
//! This module wraps the standard `http::Request` type to provide the
//! accessors the request pipeline needs, most notably parsed media-type
//! views of the `Content-Type` and `Accept` headers.

use std::convert::Into;
use std::str::FromStr;

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version, header};
use mime::Mime;

/// Represents an HTTP request header.
///
/// This struct wraps a `http::Request<()>` to provide:
/// - Access to standard HTTP header fields
/// - Parsed `Content-Type` / `Accept` media types
/// - Body attachment capabilities
/// - Request metadata inspection
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns the declared `Content-Type` as a parsed media type.
    ///
    /// Returns `None` when the header is absent or not a valid media type.
    pub fn content_type(&self) -> Option<Mime> {
        self.inner
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Mime::from_str(value).ok())
    }

    /// Returns the media types of the `Accept` header, in declaration order.
    ///
    /// Entries that fail to parse are skipped. An absent header yields an
    /// empty list, which callers should treat as "accepts anything".
    pub fn accept(&self) -> Vec<Mime> {
        let Some(value) = self.inner.headers().get(header::ACCEPT) else {
            return Vec::new();
        };
        let Ok(value) = value.to_str() else {
            return Vec::new();
        };
        value.split(',').filter_map(|entry| Mime::from_str(entry.trim()).ok()).collect()
    }

    /// Determines if this request requires a body based on its HTTP method.
    ///
    /// Returns false for methods that typically don't have bodies:
    /// GET, HEAD, DELETE, OPTIONS and CONNECT.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
