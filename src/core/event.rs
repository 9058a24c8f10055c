//! Multi-subscriber notification primitive.
//!
//! `Event<T>` is the change-notification backbone: property-changed,
//! errors-changed, busy/loaded/complete and can-execute-changed all fire
//! through it. Handles are cheap clones sharing one subscriber list, so a
//! validator can raise the errors-changed event owned by its view model
//! without holding a back-reference.

use std::sync::{Arc, RwLock};

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable key returned by [`Event::subscribe`]; pass back to
    /// [`Event::unsubscribe`] to detach.
    pub struct SubscriptionKey;
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Event<T> {
    listeners: Arc<RwLock<SlotMap<SubscriptionKey, Listener<T>>>>,
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Event<T> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(SlotMap::with_key())),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionKey {
        self.listeners
            .write()
            .expect("event listeners poisoned")
            .insert(Arc::new(listener))
    }

    pub fn unsubscribe(&self, key: SubscriptionKey) -> bool {
        self.listeners
            .write()
            .expect("event listeners poisoned")
            .remove(key)
            .is_some()
    }

    /// Invokes every listener with `payload`, in subscription order.
    ///
    /// Delivery runs against a snapshot of the subscriber list, so a
    /// listener may subscribe or unsubscribe from inside its callback;
    /// such changes take effect from the next emit.
    pub fn emit(&self, payload: &T) {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .read()
            .expect("event listeners poisoned")
            .values()
            .cloned()
            .collect();
        for listener in snapshot {
            listener(payload);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .read()
            .expect("event listeners poisoned")
            .len()
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// True when `self` and `other` share the same subscriber list.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.listeners, &other.listeners)
    }
}
