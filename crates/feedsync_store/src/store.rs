//! Reactive state container.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Notify<T> = Box<dyn FnMut(&T) + Send>;

struct SubscriberEntry<T> {
    id: u64,
    active: AtomicBool,
    notify: Mutex<Notify<T>>,
}

struct StoreInner<T> {
    value: RwLock<T>,
    version: AtomicU64,
    subscribers: Mutex<Vec<Arc<SubscriberEntry<T>>>>,
    next_id: AtomicU64,
}

/// A typed, versioned, reactive value container.
///
/// Writes are synchronous. After a commit, subscribers are invoked
/// synchronously in subscription order with a snapshot taken at commit
/// time. A commit that leaves the value `PartialEq`-equal to the
/// previous one is dropped without notifying, so a no-op partial update
/// is silent.
///
/// The store is cheap to clone; clones share the same value.
pub struct StateStore<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Clone for StateStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for StateStore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> StateStore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Creates a store holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                value: RwLock::new(value),
                version: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Runs `f` against a borrow of the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Returns the number of commits applied so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Replaces the value.
    pub fn set(&self, value: T) {
        self.commit(value);
    }

    /// Replaces the value with `f(current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.value.read());
        self.commit(next);
    }

    /// Applies a partial, in-place merge.
    ///
    /// `f` receives a clone of the current value and assigns only the
    /// fields it means to change; the result is committed as one write.
    pub fn partial_update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.inner.value.read().clone();
        f(&mut next);
        self.commit(next);
    }

    /// Notifies on every committed value change.
    ///
    /// The returned [`Subscription`] removes the subscriber when dropped
    /// or explicitly unsubscribed.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + 'static) -> Subscription {
        self.push_subscriber(Box::new(move |value| callback(value)))
    }

    /// Notifies only when `selector`'s output changes.
    ///
    /// The selected output is compared by `PartialEq` against the output
    /// seen at subscribe time (and after each notification), so commits
    /// that do not move the selected slice of state are silent.
    pub fn subscribe_with_selector<S>(
        &self,
        selector: impl Fn(&T) -> S + Send + 'static,
        callback: impl Fn(&S) + Send + 'static,
    ) -> Subscription
    where
        S: PartialEq + Clone + Send + 'static,
    {
        let mut last = self.with(&selector);
        self.push_subscriber(Box::new(move |value| {
            let selected = selector(value);
            if selected != last {
                last = selected.clone();
                callback(&selected);
            }
        }))
    }

    fn push_subscriber(&self, notify: Notify<T>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(SubscriberEntry {
            id,
            active: AtomicBool::new(true),
            notify: Mutex::new(notify),
        });
        self.inner.subscribers.lock().push(entry);

        let weak: Weak<StoreInner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut subs = inner.subscribers.lock();
                    if let Some(pos) = subs.iter().position(|e| e.id == id) {
                        subs[pos].active.store(false, Ordering::Release);
                        subs.remove(pos);
                    }
                }
            })),
        }
    }

    fn commit(&self, next: T) {
        {
            let mut guard = self.inner.value.write();
            if *guard == next {
                return;
            }
            *guard = next.clone();
        }
        self.inner.version.fetch_add(1, Ordering::AcqRel);
        self.notify(&next);
    }

    /// Invokes subscribers with the commit-time snapshot.
    ///
    /// The subscriber list lock is released before callbacks run, so a
    /// callback may subscribe or write; a nested write notifies fully
    /// before the outer notification resumes with its older snapshot.
    fn notify(&self, snapshot: &T) {
        let entries: Vec<Arc<SubscriberEntry<T>>> =
            self.inner.subscribers.lock().iter().cloned().collect();

        for entry in entries {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            // A subscriber re-entered during its own callback is skipped
            // rather than deadlocked.
            match entry.notify.try_lock() {
                Some(mut notify) => notify(snapshot),
                None => {
                    tracing::trace!(subscriber = entry.id, "skipping re-entrant notification")
                }
            }
        }
    }
}

/// Handle to an active store subscription.
///
/// The subscriber stays registered for as long as this handle lives.
/// Dropping it, or calling [`Subscription::unsubscribe`], removes the
/// subscriber. [`Subscription::detach`] leaks the registration for the
/// store's lifetime.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Removes the subscriber now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keeps the subscriber registered for the store's lifetime.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
