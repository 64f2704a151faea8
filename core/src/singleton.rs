//! Process-wide shared instances, one per type.
//!
//! Components that must exist once per process (an audio output provider, for
//! example) are created through [`instance`]. The first caller's `init` wins;
//! later callers get the same `Arc`. [`reset`] drops every cached instance and
//! exists for test teardown.
//!
//! `init` runs while the registry holds a lock on the type's slot, so it must
//! not call back into this module.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::debug;

type Instance = Arc<dyn Any + Send + Sync>;

static INSTANCES: Lazy<DashMap<TypeId, Instance>> = Lazy::new(DashMap::new);

/// Get the shared instance of `T`, creating it with `init` on first use.
pub fn instance<T, F>(init: F) -> Arc<T>
where
    T: Any + Send + Sync,
    F: FnOnce() -> T,
{
    let entry = INSTANCES
        .entry(TypeId::of::<T>())
        .or_insert_with(|| {
            debug!(target: "singleton", type_name = std::any::type_name::<T>(), "Creating shared instance");
            Arc::new(init()) as Instance
        })
        .clone();

    // Keyed by TypeId, so the downcast cannot fail.
    match entry.downcast::<T>() {
        Ok(shared) => shared,
        Err(_) => unreachable!("singleton slot holds a different type"),
    }
}

/// Get the shared instance of `T` if one was created.
pub fn get<T: Any + Send + Sync>() -> Option<Arc<T>> {
    INSTANCES
        .get(&TypeId::of::<T>())
        .map(|e| e.value().clone())
        .and_then(|e| e.downcast::<T>().ok())
}

pub fn contains<T: Any + Send + Sync>() -> bool {
    INSTANCES.contains_key(&TypeId::of::<T>())
}

/// Drop all cached instances. Test teardown only.
pub fn reset() {
    INSTANCES.clear();
}
