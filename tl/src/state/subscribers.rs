//! Subscriber registry for store change notifications

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Zero-argument change callback
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Identifier of one registration
pub type SubscriberId = u64;

#[derive(Default)]
struct Registry {
    next_id: SubscriberId,
    entries: Vec<(SubscriberId, Callback)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The set of callbacks owned by one store
#[derive(Clone, Default)]
pub(crate) struct SubscriberSet {
    registry: Arc<Mutex<Registry>>,
}

impl SubscriberSet {
    /// Register a callback, returning the handle that removes it
    pub(crate) fn add(&self, callback: Callback) -> Subscription {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push((id, callback));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invoke every current callback once
    ///
    /// Callbacks run outside the registry lock, so they may subscribe or
    /// unsubscribe while being notified.
    pub(crate) fn notify(&self) {
        let callbacks: Vec<Callback> = lock(&self.registry)
            .entries
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.registry).entries.len()
    }
}

/// Handle returned by [`crate::state::TodoStore::subscribe`]
///
/// Dropping the handle leaves the callback registered; owners remove it
/// with [`Subscription::unsubscribe`].
#[must_use = "call unsubscribe() when the owner goes away"]
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove exactly this callback
    ///
    /// Returns false if the store is gone or the callback was already removed.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = lock(&registry);
        let before = registry.entries.len();
        registry.entries.retain(|(id, _)| *id != self.id);
        registry.entries.len() != before
    }
}
