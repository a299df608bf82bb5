//! Diagnosis of requests for which no exact route matched.
//!
//! "No exact match" is ambiguous: the path may be unknown (404), known only
//! for other methods (405), or known but incompatible with the request's
//! content type (415) or accept header (406). The partition order matters —
//! a content-type mismatch is diagnosed before a method mismatch because a
//! 415 is more actionable to a caller than a generic 405 when both apply.

use std::collections::BTreeSet;
use std::sync::Arc;

use http::{Response, StatusCode, header};
use mime::Mime;
use tracing::debug;

use crate::body::ResponseBody;
use crate::error::BoxError;
use crate::lifecycle::{RequestLifecycle, plain_status};
use crate::request::ServerRequest;
use crate::route::RouteInfo;

/// Why the request missed, with the metadata needed to explain it.
#[derive(Debug)]
pub(crate) enum RouteMiss {
    UnsupportedMediaType { acceptable: Vec<Mime> },
    NotAcceptable { produceable: Vec<Mime> },
    MethodNotAllowed { allowed: BTreeSet<String> },
    NotFound,
}

/// Partitions the mismatch reasons for every route whose URI pattern matches
/// the path regardless of method, consumes or produces.
pub(crate) fn resolve_route_miss(request: &ServerRequest, candidates: &[Arc<RouteInfo>]) -> RouteMiss {
    let content_type = request.content_type();
    let accepted = request.accept();
    let has_accept = !accepted.is_empty();

    let mut acceptable: Vec<Mime> = Vec::new();
    let mut produceable: Vec<Mime> = Vec::new();
    let mut allowed: BTreeSet<String> = BTreeSet::new();

    for candidate in candidates {
        if let Some(method) = candidate.method() {
            if method != request.method() {
                allowed.insert(method.to_string());
            }
        }
        if let Some(content_type) = &content_type {
            if !candidate.does_consume(content_type) {
                push_unique(&mut acceptable, candidate.consumes());
            }
        }
        if has_accept && !candidate.does_produce(&accepted) {
            push_unique(&mut produceable, candidate.produces());
        }
    }

    if !acceptable.is_empty() {
        RouteMiss::UnsupportedMediaType { acceptable }
    } else if !produceable.is_empty() {
        RouteMiss::NotAcceptable { produceable }
    } else if !allowed.is_empty() {
        RouteMiss::MethodNotAllowed { allowed }
    } else {
        RouteMiss::NotFound
    }
}

fn push_unique(into: &mut Vec<Mime>, media_types: &[Mime]) {
    for media_type in media_types {
        if !into.contains(media_type) {
            into.push(media_type.clone());
        }
    }
}

fn format_types(media_types: &[Mime]) -> String {
    media_types.iter().map(Mime::essence_str).collect::<Vec<_>>().join(", ")
}

impl RequestLifecycle {
    pub(crate) async fn on_route_miss(&self) -> Result<Response<ResponseBody>, BoxError> {
        let request = self.request();
        debug!(method = %request.method(), uri = %request.uri(), "no matching route");

        let candidates = self.pipeline.router.find_candidates(request.uri().path(), &request);
        match resolve_route_miss(&request, &candidates) {
            RouteMiss::UnsupportedMediaType { acceptable } => {
                let content_type = request.content_type().map(|ct| ct.to_string()).unwrap_or_default();
                debug!(
                    uri = %request.uri(),
                    method = %request.method(),
                    %content_type,
                    "content type not allowed for any candidate route"
                );
                let message = format!(
                    "Content Type [{content_type}] not allowed. Allowed types: [{}]",
                    format_types(&acceptable)
                );
                self.on_status_error(plain_status(StatusCode::UNSUPPORTED_MEDIA_TYPE), &message).await
            }
            RouteMiss::NotAcceptable { produceable } => {
                debug!(uri = %request.uri(), method = %request.method(), "no candidate route produces an accepted type");
                let message = format!(
                    "Specified Accept Types [{}] not supported. Supported types: [{}]",
                    format_types(&request.accept()),
                    format_types(&produceable)
                );
                self.on_status_error(plain_status(StatusCode::NOT_ACCEPTABLE), &message).await
            }
            RouteMiss::MethodNotAllowed { allowed } => {
                debug!(uri = %request.uri(), method = %request.method(), "method not allowed");
                let allow_list = allowed.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
                let mut response = plain_status(StatusCode::METHOD_NOT_ALLOWED);
                if let Ok(value) = header::HeaderValue::from_str(&allow_list) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
                let message = format!(
                    "Method [{}] not allowed for URI [{}]. Allowed methods: [{allow_list}]",
                    request.method(),
                    request.uri()
                );
                self.on_status_error(response, &message).await
            }
            RouteMiss::NotFound => {
                self.on_status_error(plain_status(StatusCode::NOT_FOUND), "Page Not Found").await
            }
        }
    }
}
