//! Route metadata and the resolved route match.
//!
//! [`RouteInfo`] is a plain value describing a route as far as the pipeline
//! cares: where it was declared, what it consumes and produces, and how it
//! must be dispatched. Synthetic routes (built on the fly for registered
//! exception handlers) use the same value with a different [`RouteKind`]
//! instead of a parallel type hierarchy.

use std::fmt;
use std::sync::Arc;

use http::Method;
use mime::Mime;

use crate::arguments::Arguments;
use crate::handler::RouteHandler;

/// Distinguishes declared routes from synthetic handler routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// A route declared against a URI and method.
    Ordinary,
    /// A route fabricated around a registered exception handler.
    SyntheticHandler,
}

/// Declared metadata of a route.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    kind: RouteKind,
    declaring_type: Option<&'static str>,
    method: Option<Method>,
    produces: Vec<Mime>,
    consumes: Vec<Mime>,
    error_route: bool,
    bidi_streaming: bool,
    executor: Option<String>,
}

impl RouteInfo {
    /// Starts building an ordinary route description.
    pub fn builder() -> RouteInfoBuilder {
        RouteInfoBuilder::new(RouteKind::Ordinary)
    }

    /// Starts building a synthetic route description for a handler type.
    ///
    /// Synthetic routes are always error routes.
    pub fn synthetic_handler(declaring_type: &'static str) -> RouteInfoBuilder {
        let mut builder = RouteInfoBuilder::new(RouteKind::SyntheticHandler);
        builder.declaring_type = Some(declaring_type);
        builder.error_route = true;
        builder
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    /// Identity of the type that declared this route, if known.
    pub fn declaring_type(&self) -> Option<&'static str> {
        self.declaring_type
    }

    /// The HTTP method the route is declared for. Synthetic routes have none.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn produces(&self) -> &[Mime] {
        &self.produces
    }

    pub fn consumes(&self) -> &[Mime] {
        &self.consumes
    }

    /// True for routes declared to handle errors (or synthetic handler routes).
    pub fn is_error_route(&self) -> bool {
        self.error_route
    }

    /// True for bidirectional-streaming routes, which this pipeline rejects.
    pub fn is_bidi_streaming(&self) -> bool {
        self.bidi_streaming
    }

    /// Named executor the route wants blocking work dispatched to.
    pub fn executor(&self) -> Option<&str> {
        self.executor.as_deref()
    }

    /// Returns true if the route accepts the given content type.
    ///
    /// An empty consumes list accepts everything.
    pub fn does_consume(&self, content_type: &Mime) -> bool {
        self.consumes.is_empty() || self.consumes.iter().any(|pattern| media_matches(pattern, content_type))
    }

    /// Returns true if the route can produce something the client accepts.
    ///
    /// An empty accept list or an empty produces list matches everything.
    pub fn does_produce(&self, accept: &[Mime]) -> bool {
        accept.is_empty()
            || self.produces.is_empty()
            || accept.iter().any(|accepted| self.produces.iter().any(|produced| media_matches(accepted, produced)))
    }
}

/// Media range matching: `pattern` may use `*/*` or `type/*` wildcards,
/// parameters are ignored.
fn media_matches(pattern: &Mime, target: &Mime) -> bool {
    if pattern.type_() == mime::STAR {
        return true;
    }
    if pattern.type_() != target.type_() {
        return false;
    }
    pattern.subtype() == mime::STAR || pattern.subtype() == target.subtype()
}

/// Builder for [`RouteInfo`].
#[derive(Debug)]
pub struct RouteInfoBuilder {
    kind: RouteKind,
    declaring_type: Option<&'static str>,
    method: Option<Method>,
    produces: Vec<Mime>,
    consumes: Vec<Mime>,
    error_route: bool,
    bidi_streaming: bool,
    executor: Option<String>,
}

impl RouteInfoBuilder {
    fn new(kind: RouteKind) -> Self {
        Self {
            kind,
            declaring_type: None,
            method: None,
            produces: Vec::new(),
            consumes: Vec::new(),
            error_route: false,
            bidi_streaming: false,
            executor: None,
        }
    }

    pub fn declaring_type(mut self, declaring_type: &'static str) -> Self {
        self.declaring_type = Some(declaring_type);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn produces(mut self, media_type: Mime) -> Self {
        self.produces.push(media_type);
        self
    }

    pub fn consumes(mut self, media_type: Mime) -> Self {
        self.consumes.push(media_type);
        self
    }

    pub fn error_route(mut self, error_route: bool) -> Self {
        self.error_route = error_route;
        self
    }

    pub fn bidi_streaming(mut self, bidi_streaming: bool) -> Self {
        self.bidi_streaming = bidi_streaming;
        self
    }

    pub fn executor(mut self, executor: impl Into<String>) -> Self {
        self.executor = Some(executor.into());
        self
    }

    pub fn build(self) -> RouteInfo {
        RouteInfo {
            kind: self.kind,
            declaring_type: self.declaring_type,
            method: self.method,
            produces: self.produces,
            consumes: self.consumes,
            error_route: self.error_route,
            bidi_streaming: self.bidi_streaming,
            executor: self.executor,
        }
    }
}

/// Request/response attribute recording which route was matched.
///
/// Recorded on the request before the filter chain runs, and on every
/// response produced by a route invocation.
#[derive(Debug, Clone)]
pub struct MatchedRoute(pub Arc<RouteInfo>);

/// A resolved binding of a request to a handler plus its metadata.
#[derive(Clone)]
pub struct RouteMatch {
    info: Arc<RouteInfo>,
    handler: Arc<dyn RouteHandler>,
    arguments: Arguments,
}

impl RouteMatch {
    pub fn new(info: RouteInfo, handler: Arc<dyn RouteHandler>) -> Self {
        Self { info: Arc::new(info), handler, arguments: Arguments::new() }
    }

    pub fn info(&self) -> &RouteInfo {
        &self.info
    }

    pub fn info_arc(&self) -> Arc<RouteInfo> {
        Arc::clone(&self.info)
    }

    pub fn handler(&self) -> &Arc<dyn RouteHandler> {
        &self.handler
    }

    /// Arguments bound so far; empty until the argument binder ran.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Returns the match with its arguments replaced by a fulfilled set.
    #[must_use]
    pub fn with_arguments(self, arguments: Arguments) -> Self {
        Self { arguments, ..self }
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch").field("info", &self.info).field("arguments", &self.arguments).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_matching_with_wildcards() {
        let route = RouteInfo::builder().method(Method::POST).consumes(mime::APPLICATION_JSON).build();

        assert!(route.does_consume(&mime::APPLICATION_JSON));
        assert!(!route.does_consume(&mime::TEXT_PLAIN));

        let anything = RouteInfo::builder().method(Method::POST).build();
        assert!(anything.does_consume(&mime::TEXT_PLAIN));

        let any_text = RouteInfo::builder().consumes("text/*".parse().unwrap()).build();
        assert!(any_text.does_consume(&mime::TEXT_PLAIN));
        assert!(!any_text.does_consume(&mime::APPLICATION_JSON));
    }

    #[test]
    fn produce_matching_honours_accept_wildcards() {
        let route = RouteInfo::builder().produces(mime::APPLICATION_JSON).build();

        assert!(route.does_produce(&[]));
        assert!(route.does_produce(&[mime::APPLICATION_JSON]));
        assert!(route.does_produce(&[mime::TEXT_HTML, mime::STAR_STAR]));
        assert!(!route.does_produce(&[mime::TEXT_HTML]));
    }

    #[test]
    fn media_params_are_ignored() {
        let with_params: Mime = "application/json; charset=utf-8".parse().unwrap();
        let route = RouteInfo::builder().consumes(mime::APPLICATION_JSON).build();
        assert!(route.does_consume(&with_params));
    }

    #[test]
    fn synthetic_routes_are_error_routes() {
        let info = RouteInfo::synthetic_handler("my::Handler").produces(mime::APPLICATION_JSON).build();
        assert_eq!(info.kind(), RouteKind::SyntheticHandler);
        assert!(info.is_error_route());
        assert_eq!(info.declaring_type(), Some("my::Handler"));
        assert!(info.method().is_none());
    }
}
