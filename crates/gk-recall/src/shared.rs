// shared.rs — Cross-session cache sharing (v0.6.2).
//
// The cache accumulates learning across tasks, so concurrent sessions
// hold clones of one handle instead of private copies. Access goes
// through closures rather than exposed guards, which keeps lock scopes
// tight and makes it impossible to hold the cache across an external
// call. A poisoned lock is recovered, not propagated: the cache holds
// advisory state and a panicked writer must not take recall down with it.

use std::sync::{Arc, RwLock};

use crate::cache::PathCache;

/// A cloneable handle to a [`PathCache`] shared between sessions.
#[derive(Clone, Default)]
pub struct SharedPathCache {
    inner: Arc<RwLock<PathCache>>,
}

impl SharedPathCache {
    pub fn new(cache: PathCache) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cache)),
        }
    }

    /// Run a closure with shared read access.
    pub fn read<R>(&self, f: impl FnOnce(&PathCache) -> R) -> R {
        match self.inner.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// Run a closure with exclusive write access.
    pub fn write<R>(&self, f: impl FnOnce(&mut PathCache) -> R) -> R {
        match self.inner.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
