//! Bound handler arguments.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An immutable snapshot of named, type-erased handler arguments.
///
/// The argument binder produces a fulfilled snapshot from the request; the
/// pipeline itself never looks inside, it only carries the snapshot to the
/// handler. Like [`FlowContext`](crate::FlowContext), enriching a snapshot
/// yields a new value and never mutates shared state.
#[derive(Clone, Default)]
pub struct Arguments {
    entries: Option<Arc<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
}

impl Arguments {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new snapshot with `value` bound under `name`.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(&self, name: impl Into<String>, value: T) -> Self {
        let mut entries: HashMap<_, _> = self.entries.as_deref().cloned().unwrap_or_default();
        entries.insert(name.into(), Arc::new(value) as Arc<dyn Any + Send + Sync>);
        Self { entries: Some(Arc::new(entries)) }
    }

    /// Looks up an argument by name and type.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<&T> {
        self.entries.as_ref()?.get(name)?.downcast_ref()
    }

    /// Returns true if no arguments are bound.
    pub fn is_empty(&self) -> bool {
        self.entries.as_ref().is_none_or(|entries| entries.is_empty())
    }

    /// Number of bound arguments.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.len())
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self
            .entries
            .as_ref()
            .map(|entries| entries.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        f.debug_struct("Arguments").field("names", &names).finish()
    }
}
