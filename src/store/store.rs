use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

type Subscriber<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Subscribers<S> {
    next_id: AtomicUsize,
    entries: RwLock<Vec<(usize, Subscriber<S>)>>,
    // Published snapshots not yet delivered, in publish order.
    pending: Mutex<VecDeque<S>>,
    draining: AtomicBool,
}

// Clears the draining flag even if a subscriber panics.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A thread-safe observable holder of immutable state.
///
/// The state is never mutated in place: every write replaces it with a new
/// value and then notifies subscribers with the published snapshot.
/// Snapshots are delivered one at a time in the order they were published,
/// even when several threads write concurrently, so the last notification a
/// subscriber sees is always the state the store holds.
/// Cloning a `Store` yields another handle to the same state.
pub struct Store<S> {
    state: Arc<RwLock<S>>,
    subscribers: Arc<Subscribers<S>>,
}

impl<S: Clone> Store<S> {
    /// Create a new store with the given initial state.
    pub fn new(initial: S) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            subscribers: Arc::new(Subscribers {
                next_id: AtomicUsize::new(0),
                entries: RwLock::new(Vec::new()),
                pending: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Get a clone of the current state.
    pub fn get(&self) -> S {
        self.read(S::clone)
    }

    /// Read state without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&*state)
    }

    /// Replace the state wholesale.
    pub fn set(&self, new_state: S) {
        self.replace_with(|_| new_state);
    }

    /// Compute the next state from the current one and publish it.
    ///
    /// `f` runs under the write lock, so no reader sees an intermediate
    /// state. It must not call back into this store.
    pub fn replace_with<F>(&self, f: F)
    where
        F: FnOnce(&S) -> S,
    {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let next = f(&*state);
            *state = next;
            // Queued before the write lock is released, so queue order is
            // publish order.
            self.pending().push_back(state.clone());
        }
        self.drain();
    }

    /// Subscribe to state changes.
    ///
    /// The callback runs after every replacement with the new state, outside
    /// the state lock, so it may read the store. A write made from inside a
    /// callback is delivered after the current notification returns. The
    /// subscription lasts until the returned guard is dropped.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
        S: Send + 'static,
    {
        let id = self.subscribers.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));

        let registry: Weak<Subscribers<S>> = Arc::downgrade(&self.subscribers);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry
                        .entries
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, VecDeque<S>> {
        self.subscribers
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // One thread at a time delivers queued snapshots. A writer that finds
    // another thread draining leaves its snapshot for that thread.
    fn drain(&self) {
        loop {
            if self
                .subscribers
                .draining
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                return;
            }
            {
                let _guard = DrainGuard(&self.subscribers.draining);
                loop {
                    let next = self.pending().pop_front();
                    match next {
                        Some(snapshot) => self.notify(&snapshot),
                        None => break,
                    }
                }
            }
            // A snapshot queued between the last pop and releasing the flag
            // would otherwise wait for the next write.
            if self.pending().is_empty() {
                return;
            }
        }
    }

    // Callbacks are collected first so a subscriber may subscribe or write
    // to the store without deadlocking.
    fn notify(&self, state: &S) {
        let subscribers: Vec<Subscriber<S>> = self
            .subscribers
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in subscribers {
            subscriber(state);
        }
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

/// RAII guard for a store subscription.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Keep the subscription alive for the lifetime of the store.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}
