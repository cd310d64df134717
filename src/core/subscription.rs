//! Callback registration with unsubscribe-on-drop guards.
//!
//! Both collaborator interfaces (identity and transcript store) hand
//! out a `Subscription` when a callback is registered. Dropping it, or
//! calling `unsubscribe`, releases the callback so a discarded
//! conversation can't receive stale writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
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

/// A set of callbacks keyed by a registration ID.
///
/// Callbacks are always invoked without the registry lock held so a
/// callback may subscribe or unsubscribe without deadlocking.
pub struct Listeners<T> {
    next_id: Arc<AtomicU64>,
    callbacks: Arc<Mutex<HashMap<u64, Callback<T>>>>,
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            next_id: Arc::clone(&self.next_id),
            callbacks: Arc::clone(&self.callbacks),
        }
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(0)),
            callbacks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T: Clone + 'static> Listeners<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` and return its ID with the guard that
    /// removes it again.
    pub fn add(&self, callback: Callback<T>) -> (u64, Subscription) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, callback);

        let callbacks = Arc::clone(&self.callbacks);
        let subscription = Subscription::new(move || {
            callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
        });
        (id, subscription)
    }

    pub fn notify(&self, value: T) {
        let callbacks: Vec<Callback<T>> = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback(value.clone());
        }
    }

    /// Deliver `value` to a single registration if it is still
    /// subscribed. Returns whether it was delivered.
    pub fn notify_one(&self, id: u64, value: T) -> bool {
        let callback = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();
        match callback {
            Some(callback) => {
                callback(value);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, Callback<i32>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Arc::new(move |v| sink.lock().unwrap().push(v)))
    }

    #[test]
    fn test_notify_reaches_all_listeners() {
        let listeners = Listeners::new();
        let (a, cb_a) = recorder();
        let (b, cb_b) = recorder();
        let (_, _sub_a) = listeners.add(cb_a);
        let (_, _sub_b) = listeners.add(cb_b);

        listeners.notify(7);

        assert_eq!(*a.lock().unwrap(), vec![7]);
        assert_eq!(*b.lock().unwrap(), vec![7]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let listeners = Listeners::new();
        let (seen, cb) = recorder();
        let (_, sub) = listeners.add(cb);
        drop(sub);

        listeners.notify(1);

        assert!(seen.lock().unwrap().is_empty());
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_explicit_unsubscribe() {
        let listeners = Listeners::new();
        let (seen, cb) = recorder();
        let (id, sub) = listeners.add(cb);
        sub.unsubscribe();

        assert!(!listeners.notify_one(id, 3));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_callback_may_unsubscribe_during_notify() {
        let listeners: Listeners<i32> = Listeners::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot_ref = Arc::clone(&slot);
        let (_, sub) = listeners.add(Arc::new(move |_| {
            slot_ref.lock().unwrap().take();
        }));
        *slot.lock().unwrap() = Some(sub);

        listeners.notify(1);

        assert!(listeners.is_empty());
    }
}
