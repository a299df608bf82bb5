//! Error types owned by the request pipeline.
//!
//! Application failures travel through the pipeline as [`BoxError`] values
//! and are resolved to responses by the error cascade. The types here are
//! the exceptions to that rule: signals the cascade deliberately refuses to
//! turn into a response, and the one wrapper kind it unwraps first.

use std::error::Error;
use std::io;
use std::sync::Arc;

use thiserror::Error;
use weft_http::protocol::{HttpError, ParseError};

/// Boxed error type used at every fallible seam of the pipeline.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Response attribute carrying the exception a recovered response resulted
/// from.
///
/// The cascade attaches this to every response produced by an error route or
/// a registered exception handler, so downstream filters and the transport
/// can introspect what actually went wrong.
#[derive(Debug, Clone)]
pub struct CapturedCause(pub Arc<dyn Error + Send + Sync>);

/// A filter invoked its chain continuation more than once.
///
/// This is a programming error in the offending filter, not an application
/// failure: the error cascade passes it through untouched so the pipeline
/// run fails loudly instead of producing a 500 that hides the broken filter.
#[derive(Debug, Error)]
#[error(
    "the filter chain continuation must be invoked at most once per filter execution, \
     but was invoked again at position {position} of a chain of {length}"
)]
pub struct FilterContractViolation {
    position: usize,
    length: usize,
}

impl FilterContractViolation {
    pub(crate) fn new(position: usize, length: usize) -> Self {
        Self { position, length }
    }

    /// Chain position at which the extra invocation was detected.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of filters in the violated chain.
    pub fn length(&self) -> usize {
        self.length
    }
}

/// Internal signal that the lifecycle should complete without a response.
///
/// Produced by the cascade when the cause is ignorable (the peer went away);
/// it propagates out through the filter chain like an error but is turned
/// into [`FlowOutcome::Suppressed`](crate::FlowOutcome::Suppressed) at the
/// entry points.
#[derive(Debug, Error)]
#[error("response suppressed: ignorable connection failure")]
pub struct ResponseSuppressed;

/// Wrapper for failures surfaced when a deferred result is completed.
///
/// Offloaded work and joined tasks report their failure wrapped in this type
/// so that the point of completion stays visible. The error cascade unwraps
/// exactly this wrapper, exactly one level, before looking up error routes
/// and handlers, so the original failure keeps its handler-matching type.
#[derive(Debug, Error)]
#[error("deferred completion failed: {source}")]
pub struct CompletionError {
    source: BoxError,
}

impl CompletionError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self { source: source.into() }
    }

    /// Consumes the wrapper, yielding the original failure.
    pub fn into_source(self) -> BoxError {
        self.source
    }
}

/// Returns true for causes that are not real application errors.
///
/// A peer that closes its connection mid-request produces I/O failures all
/// over the pipeline; those are logged at reduced severity and produce no
/// response at all.
pub fn is_ignorable(cause: &(dyn Error + Send + Sync + 'static)) -> bool {
    if let Some(io_error) = cause.downcast_ref::<io::Error>() {
        return is_disconnect(io_error);
    }
    if let Some(parse) = cause.downcast_ref::<ParseError>() {
        return parse.is_disconnect();
    }
    if let Some(http_error) = cause.downcast_ref::<HttpError>() {
        return http_error.is_disconnect();
    }
    false
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn completion_error_unwraps_to_source() {
        let wrapped = CompletionError::new(Boom);
        assert!(wrapped.source().is_some());

        let source = wrapped.into_source();
        assert!(source.is::<Boom>());
    }

    #[test]
    fn ignorable_covers_direct_and_wrapped_disconnects() {
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(is_ignorable(&reset));

        let parse = ParseError::io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(is_ignorable(&parse));

        let http_error: HttpError = ParseError::io(io::Error::new(io::ErrorKind::ConnectionAborted, "gone")).into();
        assert!(is_ignorable(&http_error));

        assert!(!is_ignorable(&Boom));
        assert!(!is_ignorable(&io::Error::new(io::ErrorKind::TimedOut, "slow")));
    }
}
