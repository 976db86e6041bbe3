//! Listener registry with disposer handles.
//!
//! Components that fan out notifications (time updates, beats, judgments,
//! gate signals) keep a `Listeners<T>`. Subscribing returns a `Subscription`
//! whose `unsubscribe` can be called any number of times.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Slot of a registered listener.
    pub struct ListenerKey;
}

type Callback<T> = Rc<RefCell<dyn FnMut(&T)>>;
type Slots<T> = Rc<RefCell<SlotMap<ListenerKey, Callback<T>>>>;

/// Registered callbacks for one notification channel.
pub struct Listeners<T: 'static> {
    slots: Slots<T>,
    /// Log target used when a callback panics
    target: &'static str,
}

impl<T: 'static> Listeners<T> {
    pub fn new(target: &'static str) -> Self {
        Self {
            slots: Rc::new(RefCell::new(SlotMap::with_key())),
            target,
        }
    }

    /// Register a callback.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&T) + 'static,
    {
        let callback: Callback<T> = Rc::new(RefCell::new(callback));
        let key = self.slots.borrow_mut().insert(callback);
        let slots = Rc::downgrade(&self.slots);
        Subscription::new(move || {
            if let Some(slots) = slots.upgrade() {
                slots.borrow_mut().remove(key);
            }
        })
    }

    /// Call every listener with `value`.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    /// Listeners may unsubscribe (themselves or others) while being called.
    /// Returns the number of listeners that completed normally.
    pub fn emit(&self, value: &T) -> usize {
        let callbacks: Vec<Callback<T>> = self.slots.borrow().values().cloned().collect();
        let mut delivered = 0;
        for callback in callbacks {
            let Ok(mut f) = callback.try_borrow_mut() else {
                log::warn!(target: self.target, "skipping re-entrant listener call");
                continue;
            };
            match catch_unwind(AssertUnwindSafe(|| (*f)(value))) {
                Ok(()) => delivered += 1,
                Err(_) => log::error!(target: self.target, "listener panicked; continuing"),
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Drop every listener. Outstanding subscriptions become no-ops.
    pub fn clear(&self) {
        self.slots.borrow_mut().clear();
    }
}

/// Disposer for a registration.
///
/// Dropping the handle leaves the registration in place; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new<F: FnOnce() + 'static>(dispose: F) -> Self {
        Self { dispose: Some(Box::new(dispose)) }
    }

    /// Remove the registration. Safe to call repeatedly.
    pub fn unsubscribe(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    pub fn is_active(&self) -> bool {
        self.dispose.is_some()
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.is_active()).finish()
    }
}
