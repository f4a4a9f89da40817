use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

use tracing::debug;

/// A resource that can be released on demand.
///
/// Disposal is idempotent: once a value has been disposed, further calls to
/// [`dispose()`][Self::dispose] do nothing.
pub trait Disposable {
    /// Releases the resource. Calling this again after the first time has no effect.
    fn dispose(&self);
}

impl<D> Disposable for Rc<D>
where
    D: Disposable + ?Sized,
{
    #[inline]
    fn dispose(&self) {
        (**self).dispose();
    }
}

type Cleanup = Box<dyn FnOnce()>;

/// Handle to a single registration, typically a listener subscribed to an
/// [`Event`][crate::Event].
///
/// Calling [`dispose()`][Self::dispose] removes exactly the registration this handle was created
/// for. Disposing is idempotent and never fails, even if the registration is already gone because
/// the owner was disposed or dropped.
///
/// Clones share the same registration: disposing any clone disposes all of them.
///
/// Dropping a handle does **not** cancel the registration. A subscription stays active until it
/// is explicitly disposed or its owner goes away.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use emitter::Subscription;
///
/// let released = Rc::new(Cell::new(0));
///
/// let subscription = Subscription::new({
///     let released = Rc::clone(&released);
///     move || released.set(released.get() + 1)
/// });
///
/// subscription.dispose();
/// subscription.dispose();
///
/// assert_eq!(released.get(), 1);
/// assert!(subscription.is_disposed());
/// ```
#[derive(Clone)]
pub struct Subscription {
    // `None` once the cleanup has run (or for handles created already disposed).
    cleanup: Rc<RefCell<Option<Cleanup>>>,
}

impl Subscription {
    /// Creates a handle that runs `cleanup` the first time it is disposed.
    #[must_use]
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Rc::new(RefCell::new(Some(Box::new(cleanup)))),
        }
    }

    /// Creates a handle that is already disposed. Disposing it does nothing.
    ///
    /// Returned wherever a registration could not be made, e.g. when subscribing to an event
    /// whose emitter no longer exists.
    #[must_use]
    pub fn disposed() -> Self {
        Self {
            cleanup: Rc::new(RefCell::new(None)),
        }
    }

    /// Cancels the registration this handle refers to.
    ///
    /// Only the first call on any clone of the handle has an effect.
    pub fn dispose(&self) {
        // The borrow must end before the cleanup runs, as the cleanup may reenter this handle.
        let cleanup = self.cleanup.borrow_mut().take();

        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    /// Whether [`dispose()`][Self::dispose] has been called on this handle or one of its clones.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.cleanup.borrow().is_none()
    }
}

impl Disposable for Subscription {
    #[inline]
    fn dispose(&self) {
        Self::dispose(self);
    }
}

impl fmt::Debug for Subscription {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("is_disposed", &self.is_disposed())
            .finish()
    }
}

/// A collection of [`Disposable`] values that are released together.
///
/// Items are disposed in the order they were added. Once the store itself has been disposed, any
/// item added later is disposed immediately instead of being retained.
///
/// # Example
///
/// ```rust
/// use emitter::{Disposable, DisposableStore, Event, EventEmitter};
///
/// let emitter = EventEmitter::<u32>::new();
/// let store = DisposableStore::new();
///
/// emitter.subscribe_into(|_| {}, &store);
/// emitter.subscribe_into(|_| {}, &store);
/// assert_eq!(emitter.size(), 2);
///
/// store.dispose();
/// assert_eq!(emitter.size(), 0);
/// ```
#[derive(Default)]
pub struct DisposableStore {
    items: RefCell<Vec<Box<dyn Disposable>>>,
    is_disposed: Cell<bool>,
}

impl DisposableStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `item` for disposal together with the rest of the store.
    ///
    /// If the store has already been disposed, `item` is disposed right away.
    pub fn add(&self, item: impl Disposable + 'static) {
        if self.is_disposed.get() {
            debug!("item added to a disposed store, disposing it immediately");
            item.dispose();
            return;
        }

        self.items.borrow_mut().push(Box::new(item));
    }

    /// Number of items currently held by the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Whether the store currently holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Whether [`dispose()`][Disposable::dispose] has been called on the store.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.is_disposed.get()
    }
}

impl Disposable for DisposableStore {
    fn dispose(&self) {
        self.is_disposed.set(true);

        // Items may add to this store while being disposed, so we cannot hold the borrow.
        let items = mem::take(&mut *self.items.borrow_mut());

        for item in items {
            item.dispose();
        }
    }
}

impl fmt::Debug for DisposableStore {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("len", &self.len())
            .field("is_disposed", &self.is_disposed.get())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_not_impl_any;

    use super::*;

    assert_not_impl_any!(Subscription: Send, Sync);
    assert_not_impl_any!(DisposableStore: Send, Sync);

    fn counting_subscription(counter: &Rc<Cell<usize>>) -> Subscription {
        let counter = Rc::clone(counter);
        Subscription::new(move || counter.set(counter.get() + 1))
    }

    #[test]
    fn dispose_runs_cleanup_once() {
        let counter = Rc::new(Cell::new(0));
        let subscription = counting_subscription(&counter);

        assert!(!subscription.is_disposed());

        subscription.dispose();
        subscription.dispose();

        assert_eq!(counter.get(), 1);
        assert!(subscription.is_disposed());
    }

    #[test]
    fn clones_share_disposal() {
        let counter = Rc::new(Cell::new(0));
        let subscription = counting_subscription(&counter);
        let clone = subscription.clone();

        clone.dispose();
        subscription.dispose();

        assert_eq!(counter.get(), 1);
        assert!(subscription.is_disposed());
    }

    #[test]
    fn drop_does_not_dispose() {
        let counter = Rc::new(Cell::new(0));
        drop(counting_subscription(&counter));

        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn disposed_handle_is_inert() {
        let subscription = Subscription::disposed();
        assert!(subscription.is_disposed());

        subscription.dispose();
        assert!(subscription.is_disposed());
    }

    #[test]
    fn cleanup_may_dispose_its_own_handle() {
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::default();
        let counter = Rc::new(Cell::new(0));

        let subscription = Subscription::new({
            let slot = Rc::clone(&slot);
            let counter = Rc::clone(&counter);
            move || {
                counter.set(counter.get() + 1);

                let own = slot.borrow().clone();
                if let Some(own) = own {
                    own.dispose();
                }
            }
        });
        *slot.borrow_mut() = Some(subscription.clone());

        subscription.dispose();

        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn store_disposes_all_items_in_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let store = DisposableStore::new();

        for index in 0..3 {
            let order = Rc::clone(&order);
            store.add(Subscription::new(move || order.borrow_mut().push(index)));
        }

        assert_eq!(store.len(), 3);

        store.dispose();

        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert!(store.is_empty());
        assert!(store.is_disposed());
    }

    #[test]
    fn store_dispose_is_idempotent() {
        let counter = Rc::new(Cell::new(0));
        let store = DisposableStore::new();
        store.add(counting_subscription(&counter));

        store.dispose();
        store.dispose();

        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn add_after_dispose_disposes_immediately() {
        let counter = Rc::new(Cell::new(0));
        let store = DisposableStore::new();
        store.dispose();

        store.add(counting_subscription(&counter));

        assert_eq!(counter.get(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn stores_nest() {
        let counter = Rc::new(Cell::new(0));
        let inner = Rc::new(DisposableStore::new());
        inner.add(counting_subscription(&counter));

        let outer = DisposableStore::new();
        outer.add(Rc::clone(&inner));
        outer.dispose();

        assert_eq!(counter.get(), 1);
        assert!(inner.is_disposed());
    }
}
