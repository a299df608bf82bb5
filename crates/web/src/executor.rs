//! Named executor selection for blocking offload.

use std::collections::HashMap;

use tokio::runtime::Handle;
use tracing::warn;

use crate::route::RouteInfo;

/// Registry of named runtime handles routes can designate for blocking work.
///
/// A route (or a synthetic exception-handler registration) that names an
/// executor gets its synchronous invocation dispatched via
/// [`Handle::spawn_blocking`] on the named runtime instead of running on the
/// request task.
#[derive(Debug, Clone, Default)]
pub struct ExecutorRegistry {
    named: HashMap<String, Handle>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a runtime handle under `name`.
    pub fn register(&mut self, name: impl Into<String>, handle: Handle) -> &mut Self {
        self.named.insert(name.into(), handle);
        self
    }

    /// Selects the executor the route designates, if any.
    ///
    /// A designation that names an unknown executor is reported and treated
    /// as "no offload" rather than failing the request.
    pub fn select(&self, info: &RouteInfo) -> Option<Handle> {
        let name = info.executor()?;
        let handle = self.named.get(name).cloned();
        if handle.is_none() {
            warn!(executor = name, "route designates an unknown executor, running inline");
        }
        handle
    }
}
