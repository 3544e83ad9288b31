// handle.rs: Shared, atomically replaceable access to the current engine.
//
// Tools and the registry hold a PolicyHandle instead of an engine. Each
// call takes a snapshot (`current()`), so a reload swaps the whole
// engine between calls and no reader ever sees a partly applied policy.

use std::sync::{Arc, RwLock};

use crate::engine::PolicyEngine;

/// Cloneable reference to the process's active [`PolicyEngine`].
#[derive(Debug, Clone)]
pub struct PolicyHandle {
    inner: Arc<RwLock<Arc<PolicyEngine>>>,
}

impl PolicyHandle {
    pub fn new(engine: PolicyEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(engine))),
        }
    }

    /// Snapshot of the engine in effect right now.
    ///
    /// The lock is held only long enough to clone the `Arc`; decisions run
    /// without it.
    pub fn current(&self) -> Arc<PolicyEngine> {
        // A poisoned lock still holds a complete engine: writers only ever
        // assign a whole Arc.
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install a new engine, returning the one it replaced.
    pub fn replace(&self, engine: PolicyEngine) -> Arc<PolicyEngine> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, Arc::new(engine));
        tracing::info!(
            workspace = %guard.workspace().display(),
            "policy replaced"
        );
        previous
    }
}

impl From<PolicyEngine> for PolicyHandle {
    fn from(engine: PolicyEngine) -> Self {
        Self::new(engine)
    }
}
