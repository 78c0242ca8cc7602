//! Live-query listeners
//!
//! A listener is registered against one collection key (a group's members, a
//! group's availability, a plan's votes) and receives the full snapshot of that
//! collection after every committed write. Registration hands back a
//! [`Subscription`]; cancelling or dropping it unregisters the listener.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::debug;

pub(crate) type Listener<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

struct Entries<K, T> {
    next_id: u64,
    by_id: HashMap<u64, (K, Listener<T>)>,
}

/// Listeners for one kind of collection, keyed by collection id
pub(crate) struct ListenerRegistry<K, T> {
    entries: Arc<Mutex<Entries<K, T>>>,
}

impl<K, T> ListenerRegistry<K, T>
where
    K: PartialEq + Send + 'static,
    T: 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries {
                next_id: 0,
                by_id: HashMap::new(),
            })),
        }
    }

    fn lock(entries: &Mutex<Entries<K, T>>) -> MutexGuard<'_, Entries<K, T>> {
        // A listener that panicked must not take the whole registry down with it
        entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a listener on `key`
    pub fn register(&self, key: K, listener: Listener<T>) -> Subscription {
        let id = {
            let mut entries = Self::lock(&self.entries);
            let id = entries.next_id;
            entries.next_id += 1;
            entries.by_id.insert(id, (key, listener));
            id
        };

        let weak: Weak<Mutex<Entries<K, T>>> = Arc::downgrade(&self.entries);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(entries) = weak.upgrade() {
                    Self::lock(&entries).by_id.remove(&id);
                    debug!(listener_id = id, "Listener cancelled");
                }
            })),
        }
    }

    pub fn has_listeners(&self, key: &K) -> bool {
        Self::lock(&self.entries)
            .by_id
            .values()
            .any(|(k, _)| k == key)
    }

    /// Deliver a snapshot to every listener on `key`.
    ///
    /// Callbacks run after the registry lock is released, so a listener may cancel
    /// its own (or any other) subscription from inside the callback.
    pub fn notify(&self, key: &K, snapshot: &[T]) {
        let listeners: Vec<Listener<T>> = Self::lock(&self.entries)
            .by_id
            .values()
            .filter(|(k, _)| k == key)
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(snapshot);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        Self::lock(&self.entries).by_id.len()
    }
}

/// Handle to a registered listener.
///
/// Snapshots stop as soon as the handle is cancelled or dropped. Writes already
/// committed are not affected.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Stop receiving snapshots
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
