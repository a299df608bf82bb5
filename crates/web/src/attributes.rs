//! Type-keyed request attributes.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// A shared, type-keyed attribute map attached to a request.
///
/// The map is shared between all clones of a request, so attributes recorded
/// before the filter chain runs (such as the matched route) remain visible
/// downstream even when a filter substitutes the request itself.
#[derive(Clone, Default)]
pub struct Attributes {
    inner: Arc<Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, keyed by its type, returning any previous value.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) -> Option<Arc<T>> {
        self.lock()
            .insert(TypeId::of::<T>(), Arc::new(value))
            .and_then(|previous| previous.downcast().ok())
    }

    /// Looks up an attribute by type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.lock().get(&TypeId::of::<T>()).cloned().and_then(|value| value.downcast().ok())
    }

    /// Removes and returns the attribute of type `T`.
    pub fn remove<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.lock().remove(&TypeId::of::<T>()).and_then(|value| value.downcast().ok())
    }

    /// Returns true if an attribute of type `T` is present.
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.lock().contains_key(&TypeId::of::<T>())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TypeId, Arc<dyn Any + Send + Sync>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attributes").field("len", &self.lock().len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct RequestId(u64);

    #[test]
    fn insert_get_remove() {
        let attributes = Attributes::new();
        assert!(!attributes.contains::<RequestId>());

        assert!(attributes.insert(RequestId(1)).is_none());
        let previous = attributes.insert(RequestId(2));
        assert_eq!(previous.as_deref(), Some(&RequestId(1)));

        assert_eq!(attributes.get::<RequestId>().as_deref(), Some(&RequestId(2)));
        assert_eq!(attributes.remove::<RequestId>().as_deref(), Some(&RequestId(2)));
        assert!(attributes.get::<RequestId>().is_none());
    }

    #[test]
    fn shared_between_clones() {
        let attributes = Attributes::new();
        let cloned = attributes.clone();

        attributes.insert(RequestId(7));
        assert_eq!(cloned.get::<RequestId>().as_deref(), Some(&RequestId(7)));
    }
}
