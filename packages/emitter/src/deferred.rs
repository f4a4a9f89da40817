use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{self, Poll, Waker};

use crate::{Disposable, DisposableStore, Subscription};

struct Slot<T> {
    // Set by the resolver, taken by the first poll that completes.
    value: Option<T>,

    // Waker of whoever most recently polled the deferred value while it was pending.
    awaiter: Option<Waker>,

    // Once true, the value has been delivered into the slot (and maybe already taken out again).
    is_resolved: bool,
}

impl<T> Slot<T> {
    fn pending() -> Self {
        Self {
            value: None,
            awaiter: None,
            is_resolved: false,
        }
    }

    fn resolved(value: T) -> Self {
        Self {
            value: Some(value),
            awaiter: None,
            is_resolved: true,
        }
    }
}

/// A single value that becomes available at some point in the future.
///
/// Await it (it implements [`Future`]) or extract the value without waiting via
/// [`into_value()`][Self::into_value]. A deferred value never fails: it either resolves with a
/// value or stays pending forever.
///
/// Deferred values produced by [`to_promise()`][crate::to_promise] and
/// [`to_promise_with_signal()`][crate::to_promise_with_signal] own the registrations that will
/// eventually resolve them. Dropping such a value before it resolves cancels those registrations.
///
/// # Example
///
/// ```rust
/// use emitter::Deferred;
/// use futures::executor::block_on;
///
/// let (resolver, deferred) = Deferred::<u32>::pending();
///
/// assert!(!deferred.is_ready());
/// resolver.resolve(42);
/// assert!(deferred.is_ready());
///
/// assert_eq!(block_on(deferred), 42);
/// ```
pub struct Deferred<T> {
    // `None` once a poll has returned `Ready`.
    slot: Option<Rc<RefCell<Slot<T>>>>,

    // Registrations that feed this value. Released when the value is dropped.
    registrations: DisposableStore,
}

impl<T> Deferred<T> {
    /// Creates a pending deferred value together with the [`Resolver`] that completes it.
    #[must_use]
    pub fn pending() -> (Resolver<T>, Self) {
        let slot = Rc::new(RefCell::new(Slot::pending()));

        let resolver = Resolver {
            slot: Rc::downgrade(&slot),
        };

        (resolver, Self::from_slot(slot))
    }

    /// Creates a deferred value that is already resolved with `value`.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        Self::from_slot(Rc::new(RefCell::new(Slot::resolved(value))))
    }

    fn from_slot(slot: Rc<RefCell<Slot<T>>>) -> Self {
        Self {
            slot: Some(slot),
            registrations: DisposableStore::new(),
        }
    }

    /// Ties `subscription` to the lifetime of this value: it is disposed when the value is
    /// dropped, whether or not it has resolved by then.
    pub(crate) fn retain(&self, subscription: Subscription) {
        self.registrations.add(subscription);
    }

    /// Checks whether the value is available.
    ///
    /// # Panics
    ///
    /// Panics if called after the value has been received by awaiting.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let Some(slot) = &self.slot else {
            panic!("deferred value queried after completion");
        };

        slot.borrow().value.is_some()
    }

    /// Consumes the deferred value and returns the value if it is already available.
    ///
    /// If the value is still pending, the deferred value is handed back unchanged so it can be
    /// awaited or checked again later.
    ///
    /// # Panics
    ///
    /// Panics if called after the value has been received by awaiting.
    ///
    /// # Example
    ///
    /// ```rust
    /// use emitter::Deferred;
    ///
    /// let (resolver, deferred) = Deferred::<&str>::pending();
    ///
    /// let deferred = deferred.into_value().unwrap_err();
    ///
    /// resolver.resolve("done");
    /// assert_eq!(deferred.into_value().ok(), Some("done"));
    /// ```
    pub fn into_value(mut self) -> Result<T, Self> {
        let slot = self
            .slot
            .take()
            .expect("deferred value queried after completion");

        let value = slot.borrow_mut().value.take();

        match value {
            Some(value) => Ok(value),
            None => {
                self.slot = Some(slot);
                Err(self)
            }
        }
    }
}

impl<T> Future for Deferred<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let slot = this
            .slot
            .as_ref()
            .expect("deferred value polled after completion");

        let mut guard = slot.borrow_mut();

        if let Some(value) = guard.value.take() {
            drop(guard);
            this.slot = None;
            return Poll::Ready(value);
        }

        let is_same_awaiter = guard
            .awaiter
            .as_ref()
            .is_some_and(|awaiter| awaiter.will_wake(cx.waker()));

        if !is_same_awaiter {
            guard.awaiter = Some(cx.waker().clone());
        }

        Poll::Pending
    }
}

impl<T> Drop for Deferred<T> {
    fn drop(&mut self) {
        self.registrations.dispose();
    }
}

impl<T> fmt::Debug for Deferred<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field(
                "is_resolved",
                &self.slot.as_ref().is_none_or(|slot| slot.borrow().is_resolved),
            )
            .field("registrations", &self.registrations.len())
            .finish_non_exhaustive()
    }
}

/// Completes the [`Deferred`] value it was created with.
///
/// Clones resolve the same deferred value. Only the first resolution is kept; later ones are
/// ignored.
pub struct Resolver<T> {
    slot: Weak<RefCell<Slot<T>>>,
}

impl<T> Resolver<T> {
    /// Makes `value` available to the deferred value and wakes anyone awaiting it.
    ///
    /// Returns `false` without doing anything if the deferred value was already resolved or no
    /// longer exists.
    pub fn resolve(&self, value: T) -> bool {
        let Some(slot) = self.slot.upgrade() else {
            return false;
        };

        let awaiter = {
            let mut slot = slot.borrow_mut();

            if slot.is_resolved {
                return false;
            }

            slot.is_resolved = true;
            slot.value = Some(value);
            slot.awaiter.take()
        };

        if let Some(awaiter) = awaiter {
            awaiter.wake();
        }

        true
    }

    /// Whether the deferred value has been resolved, by this or any other clone of the resolver.
    ///
    /// Also returns `true` if the deferred value no longer exists, as it can no longer be
    /// resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.slot
            .upgrade()
            .is_none_or(|slot| slot.borrow().is_resolved)
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Weak::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("is_resolved", &self.is_resolved())
            .finish()
    }
}
