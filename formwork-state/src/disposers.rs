//! Cancellable subscription handles and the registry that owns them.
//!
//! A [`Subscription`] releases its listener exactly once: `cancel` consumes
//! the handle. [`Disposers`] keys live handles by `(scope, kind)` and releases
//! whatever is left when it is dropped.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a subscription hooks into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DisposerKind {
    /// Runs before a change is applied and may rewrite or veto it.
    Interceptor,
    /// Runs after a change is applied.
    Observer,
}

/// Registry key for a live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisposerKey {
    pub scope: String,
    pub kind: DisposerKind,
}

impl DisposerKey {
    pub fn new(scope: impl Into<String>, kind: DisposerKind) -> Self {
        Self {
            scope: scope.into(),
            kind,
        }
    }

    pub fn observer(scope: impl Into<String>) -> Self {
        Self::new(scope, DisposerKind::Observer)
    }

    pub fn interceptor(scope: impl Into<String>) -> Self {
        Self::new(scope, DisposerKind::Interceptor)
    }
}

impl fmt::Display for DisposerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.scope, self.kind)
    }
}

/// Handle to a registered listener.
///
/// Dropping a handle does not release the listener; call [`cancel`](Self::cancel)
/// or hand it to a [`Disposers`] registry.
#[must_use = "a subscription stays active until it is cancelled"]
pub struct Subscription {
    release: Box<dyn FnOnce()>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Box::new(release),
        }
    }

    /// Remove the listener. Consumes the handle so it cannot run twice.
    pub fn cancel(self) {
        (self.release)();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Live subscriptions keyed by `(scope, kind)`.
#[derive(Debug, Default)]
pub struct Disposers {
    handles: HashMap<DisposerKey, Subscription>,
}

impl Disposers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle. An existing handle under the same key is cancelled first.
    pub fn insert(&mut self, key: DisposerKey, subscription: Subscription) {
        if let Some(previous) = self.handles.insert(key.clone(), subscription) {
            debug!(%key, "replacing subscription");
            previous.cancel();
        }
    }

    pub fn contains(&self, key: &DisposerKey) -> bool {
        self.handles.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel and forget one handle. Returns false when nothing was registered.
    pub fn dispose(&mut self, key: &DisposerKey) -> bool {
        match self.handles.remove(key) {
            Some(subscription) => {
                debug!(%key, "disposing subscription");
                subscription.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every handle. Returns how many were released.
    pub fn dispose_all(&mut self) -> usize {
        let count = self.handles.len();
        for (key, subscription) in self.handles.drain() {
            debug!(%key, "disposing subscription");
            subscription.cancel();
        }
        count
    }
}

impl Drop for Disposers {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
