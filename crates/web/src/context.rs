//! Ambient execution context propagated along the filter chain.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An immutable, type-keyed snapshot of ambient per-request values.
///
/// Filters thread a `FlowContext` explicitly through each continuation call:
/// enriching it produces a *new* snapshot, the filter's own snapshot stays
/// untouched when control returns back up. The snapshot passed by the last
/// filter is the one the terminal step (argument fulfillment and handler
/// invocation) observes.
///
/// Cloning is cheap; the entry map is shared, never mutated in place, so
/// concurrent requests stay isolated without synchronization.
#[derive(Clone, Default)]
pub struct FlowContext {
    entries: Option<Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>>,
}

impl FlowContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new snapshot with `value` added, keyed by its type.
    ///
    /// An existing value of the same type is replaced in the new snapshot.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(&self, value: T) -> Self {
        let mut entries: HashMap<_, _> = self.entries.as_deref().cloned().unwrap_or_default();
        entries.insert(TypeId::of::<T>(), Arc::new(value) as Arc<dyn Any + Send + Sync>);
        Self { entries: Some(Arc::new(entries)) }
    }

    /// Looks up a value by type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.entries.as_ref()?.get(&TypeId::of::<T>())?.downcast_ref()
    }

    /// Returns true if a value of type `T` is present.
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.get::<T>().is_some()
    }

    /// Returns true if the context carries no values.
    pub fn is_empty(&self) -> bool {
        self.entries.as_ref().is_none_or(|entries| entries.is_empty())
    }
}

impl fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.entries.as_ref().map_or(0, |entries| entries.len());
        f.debug_struct("FlowContext").field("len", &len).finish()
    }
}
