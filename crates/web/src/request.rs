//! The request handle the pipeline operates on.
//!
//! A [`ServerRequest`] is the engine's view of one inbound request: the
//! parsed header, a shared attribute map and the shared consumable body.
//! Clones are cheap and all refer to the same attributes and body, which is
//! what lets the lifecycle track the *current* request while filters hold
//! and possibly substitute their own copies.

use http::{HeaderMap, Method, Uri, Version};
use mime::Mime;
use std::sync::Arc;
use weft_http::protocol::RequestHeader;
use weft_http::protocol::body::ReqBody;

use crate::attributes::Attributes;
use crate::body::OptionReqBody;

/// One inbound HTTP request as seen by the pipeline.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    head: Arc<RequestHeader>,
    attributes: Attributes,
    body: OptionReqBody,
}

impl ServerRequest {
    /// Creates a request from a parsed header and its body.
    pub fn new(header: RequestHeader, body: ReqBody) -> Self {
        Self { head: Arc::new(header), attributes: Attributes::new(), body: body.into() }
    }

    /// Creates a bodyless request.
    pub fn from_header(header: RequestHeader) -> Self {
        Self::new(header, ReqBody::empty())
    }

    /// Returns the parsed request header.
    pub fn header(&self) -> &RequestHeader {
        &self.head
    }

    /// Returns the HTTP method of the request.
    pub fn method(&self) -> &Method {
        self.head.method()
    }

    /// Returns the URI of the request.
    pub fn uri(&self) -> &Uri {
        self.head.uri()
    }

    /// Returns the HTTP version of the request.
    pub fn version(&self) -> Version {
        self.head.version()
    }

    /// Returns the HTTP headers of the request.
    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    /// Returns the declared `Content-Type`, if any.
    pub fn content_type(&self) -> Option<Mime> {
        self.head.content_type()
    }

    /// Returns the parsed `Accept` media types, in declaration order.
    pub fn accept(&self) -> Vec<Mime> {
        self.head.accept()
    }

    /// Returns the request's attribute map, shared across all clones.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Returns a handle to the request body, shared across all clones.
    pub fn body(&self) -> OptionReqBody {
        self.body.clone()
    }

    /// Replaces the request header, keeping attributes and body.
    ///
    /// This is how a filter substitutes a modified request: downstream
    /// observers still see attributes recorded on the original.
    #[must_use]
    pub fn with_header(self, header: RequestHeader) -> Self {
        Self { head: Arc::new(header), ..self }
    }

    /// Replaces the request body, keeping header and attributes.
    #[must_use]
    pub fn with_body(self, body: ReqBody) -> Self {
        Self { body: body.into(), ..self }
    }
}
