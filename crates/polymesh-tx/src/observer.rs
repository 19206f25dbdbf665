//! Listener lists with synchronous, race-free removal.
//!
//! Every listener carries an `active` flag that is checked right before each
//! invocation. Unsubscribing clears the flag first, so once `unsubscribe()`
//! returns no later delivery can reach the listener; at most a call that was
//! already executing may finish.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Lock a mutex, recovering the data if a listener panicked while it was held.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Entry<T> {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Callback<T>,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: self.active.clone(),
            callback: self.callback.clone(),
        }
    }
}

pub(crate) struct Observers<T> {
    entries: Arc<Mutex<Vec<Entry<T>>>>,
    next_id: AtomicU64,
}

impl<T: Clone + 'static> Observers<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self, callback: Callback<T>) -> Unsubscribe {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        lock(&self.entries).push(Entry {
            id,
            active: active.clone(),
            callback,
        });

        let entries: Weak<Mutex<Vec<Entry<T>>>> = Arc::downgrade(&self.entries);
        Unsubscribe {
            active,
            remove: Some(Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    lock(&entries).retain(|entry| entry.id != id);
                }
            })),
        }
    }

    /// Deliver `value` to every listener still subscribed.
    pub fn notify(&self, value: T) {
        let snapshot: Vec<Entry<T>> = lock(&self.entries).clone();
        deliver(&snapshot, value);
    }

    /// Remove every listener and deliver `value` to those still subscribed.
    pub fn drain_notify(&self, value: T) {
        let drained: Vec<Entry<T>> = std::mem::take(&mut *lock(&self.entries));
        deliver(&drained, value);
    }

    pub fn has_active(&self) -> bool {
        lock(&self.entries)
            .iter()
            .any(|entry| entry.active.load(Ordering::SeqCst))
    }
}

fn deliver<T: Clone>(entries: &[Entry<T>], value: T) {
    for entry in entries {
        if entry.active.load(Ordering::SeqCst) {
            (entry.callback)(value.clone());
        }
    }
}

/// Handle returned by every subscription.
///
/// Dropping the handle leaves the listener registered; call
/// [`Unsubscribe::unsubscribe`] to remove it.
pub struct Unsubscribe {
    active: Arc<AtomicBool>,
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Unsubscribe {
    /// A handle for a listener that will never be called again.
    pub(crate) fn inert() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            remove: None,
        }
    }

    pub fn unsubscribe(mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.is_active())
            .finish()
    }
}
