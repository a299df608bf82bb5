//! Registry of global exception handlers.
//!
//! Route-local error routes are the router's business; this registry is the
//! second tier of the cascade: handlers registered for a concrete error
//! type, independent of any route. Matching is by the exact runtime type of
//! the (unwrapped) cause.

use std::any::type_name;
use std::error::Error;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use http::Response;

use crate::body::ResponseBody;
use crate::error::BoxError;
use crate::request::ServerRequest;
use crate::responder::Responder;
use crate::route::RouteInfo;

/// Handles one kind of application error, producing a response body.
///
/// Implementations may block: when the synthetic route metadata of the
/// registration names an executor, the cascade offloads the call with
/// `spawn_blocking` instead of running it on the request task.
pub trait ExceptionHandler: Send + Sync {
    fn handle(
        &self,
        request: &ServerRequest,
        cause: &(dyn Error + Send + Sync + 'static),
    ) -> Result<Response<ResponseBody>, BoxError>;
}

type CauseMatcher = Box<dyn Fn(&(dyn Error + Send + Sync + 'static)) -> bool + Send + Sync>;

struct Registration {
    matches: CauseMatcher,
    handler: Arc<dyn ExceptionHandler>,
    info: Arc<RouteInfo>,
}

/// Type-indexed collection of registered exception handlers.
#[derive(Default)]
pub struct ExceptionHandlers {
    entries: Vec<Registration>,
}

impl ExceptionHandlers {
    pub fn builder() -> ExceptionHandlersBuilder {
        ExceptionHandlersBuilder { entries: Vec::new() }
    }

    /// Finds the handler registered for the exact runtime type of `cause`.
    pub fn find(
        &self,
        cause: &(dyn Error + Send + Sync + 'static),
    ) -> Option<(Arc<dyn ExceptionHandler>, Arc<RouteInfo>)> {
        self.entries
            .iter()
            .find(|registration| (registration.matches)(cause))
            .map(|registration| (Arc::clone(&registration.handler), Arc::clone(&registration.info)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for ExceptionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionHandlers").field("len", &self.entries.len()).finish()
    }
}

#[derive(Default)]
pub struct ExceptionHandlersBuilder {
    entries: Vec<Registration>,
}

impl ExceptionHandlersBuilder {
    /// Registers `handler` for causes of type `E`.
    ///
    /// The registration gets default synthetic route metadata declared by
    /// the handler's type.
    pub fn register<E, H>(self, handler: H) -> Self
    where
        E: Error + Send + Sync + 'static,
        H: ExceptionHandler + 'static,
    {
        let info = RouteInfo::synthetic_handler(type_name::<H>()).build();
        self.register_with::<E, H>(handler, info)
    }

    /// Registers `handler` for causes of type `E` with explicit synthetic
    /// route metadata (produced media types, executor designation).
    pub fn register_with<E, H>(mut self, handler: H, info: RouteInfo) -> Self
    where
        E: Error + Send + Sync + 'static,
        H: ExceptionHandler + 'static,
    {
        self.entries.push(Registration {
            matches: Box::new(|cause: &(dyn Error + Send + Sync + 'static)| cause.is::<E>()),
            handler: Arc::new(handler),
            info: Arc::new(info),
        });
        self
    }

    pub fn build(self) -> ExceptionHandlers {
        ExceptionHandlers { entries: self.entries }
    }
}

impl fmt::Debug for ExceptionHandlersBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionHandlersBuilder").field("len", &self.entries.len()).finish()
    }
}

/// Adapter turning a typed closure into an [`ExceptionHandler`].
///
/// The closure receives the concrete cause and produces anything that
/// implements [`Responder`] — the same body-to-response path ordinary
/// handler results take.
pub fn exception_handler_fn<E, F, R>(f: F) -> FnExceptionHandler<E, F>
where
    E: Error + Send + Sync + 'static,
    F: Fn(&ServerRequest, &E) -> R + Send + Sync,
    R: Responder,
{
    FnExceptionHandler { f, _cause: PhantomData }
}

pub struct FnExceptionHandler<E, F> {
    f: F,
    _cause: PhantomData<fn(E)>,
}

impl<E, F> fmt::Debug for FnExceptionHandler<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExceptionHandler").field("cause", &type_name::<E>()).finish()
    }
}

impl<E, F, R> ExceptionHandler for FnExceptionHandler<E, F>
where
    E: Error + Send + Sync + 'static,
    F: Fn(&ServerRequest, &E) -> R + Send + Sync,
    R: Responder,
{
    fn handle(
        &self,
        request: &ServerRequest,
        cause: &(dyn Error + Send + Sync + 'static),
    ) -> Result<Response<ResponseBody>, BoxError> {
        let Some(cause) = cause.downcast_ref::<E>() else {
            return Err(format!("exception handler for {} invoked with a different cause type", type_name::<E>()).into());
        };
        Ok((self.f)(request, cause).response_to(request))
    }
}
