//! The emitter core: an ordered set of listeners for one event stream.
//!
//! Listeners live in an `Rc<Vec<_>>` that is only ever modified copy-on-write. Firing takes a
//! snapshot of that `Rc` (a reference count bump) and walks the snapshot, so a listener may
//! subscribe, unsubscribe or dispose the emitter during a fire without affecting the pass that is
//! currently in progress:
//!
//! * A listener added during a fire is first called on the next fire.
//! * A listener removed during a fire is still called in the current pass if it has not been
//!   reached yet, and never again afterwards.
//!
//! No `RefCell` borrow is held while a listener runs.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::{Disposable, Event, Listener, Subscription};

// Every subscription receives a fresh identifier, so registering the same listener twice creates
// two registrations that are removed independently of each other.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ListenerId(u64);

struct Entry<T> {
    id: ListenerId,
    listener: Listener<T>,
}

// Manual impl because a derive would require `T: Clone`.
impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            listener: Rc::clone(&self.listener),
        }
    }
}

type Listeners<T> = Rc<Vec<Entry<T>>>;

struct Shared<T> {
    // `None` until the first subscription and after the emitter is disposed or emptied.
    listeners: RefCell<Option<Listeners<T>>>,
    next_id: Cell<u64>,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            listeners: RefCell::new(None),
            next_id: Cell::new(0),
        }
    }

    fn add(&self, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(
            self.next_id
                .get()
                .checked_add(1)
                .expect("listener identifiers exhausted - more than u64::MAX subscriptions"),
        );

        let entry = Entry { id, listener };

        let mut listeners = self.listeners.borrow_mut();
        match listeners.as_mut() {
            Some(existing) => Rc::make_mut(existing).push(entry),
            None => *listeners = Some(Rc::new(vec![entry])),
        }

        trace!(
            listener_id = id.0,
            listeners = listeners.as_ref().map_or(0, |l| l.len()),
            "listener subscribed"
        );

        id
    }

    fn remove(&self, id: ListenerId) {
        let removed = {
            let mut listeners = self.listeners.borrow_mut();

            let Some(existing) = listeners.as_mut() else {
                return;
            };

            let Some(index) = existing.iter().position(|entry| entry.id == id) else {
                return;
            };

            let removed = Rc::make_mut(existing).remove(index);

            if existing.is_empty() {
                *listeners = None;
            }

            trace!(
                listener_id = id.0,
                listeners = listeners.as_ref().map_or(0, |l| l.len()),
                "listener unsubscribed"
            );

            removed
        };

        // Dropping the listener may run arbitrary destructors that call back into the emitter,
        // so this happens only after the borrow has been released.
        drop(removed);
    }

    fn snapshot(&self) -> Option<Listeners<T>> {
        self.listeners.borrow().clone()
    }

    fn len(&self) -> usize {
        self.listeners.borrow().as_ref().map_or(0, |l| l.len())
    }

    fn clear(&self) {
        let removed = self.listeners.borrow_mut().take();

        debug!(
            listeners = removed.as_ref().map_or(0, |l| l.len()),
            "emitter disposed"
        );

        drop(removed);
    }
}

fn subscribe_shared<T>(shared: &Rc<Shared<T>>, listener: Listener<T>) -> Subscription
where
    T: 'static,
{
    let id = shared.add(listener);
    let shared = Rc::downgrade(shared);

    Subscription::new(move || {
        if let Some(shared) = shared.upgrade() {
            shared.remove(id);
        }
    })
}

/// A typed, single-threaded event emitter.
///
/// Listeners are called synchronously by [`fire()`][Self::fire], in the order they subscribed.
/// Subscribing happens through the [`Event`] trait, either on the emitter itself or on the
/// read-only [`EmitterEvent`] returned by [`event()`][Self::event], which is what you would
/// normally hand out to consumers.
///
/// The emitter does not allocate any listener storage until the first subscription.
///
/// A panic in a listener propagates out of [`fire()`][Self::fire] and the listeners after it are
/// not called in that pass. The emitter remains usable afterwards.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use emitter::{Event, EventEmitter};
///
/// let emitter = EventEmitter::<String>::new();
/// let received = Rc::new(RefCell::new(Vec::new()));
///
/// let subscription = emitter.event().subscribe({
///     let received = Rc::clone(&received);
///     move |message: &String| received.borrow_mut().push(message.clone())
/// });
///
/// emitter.fire(&"first".to_string());
/// subscription.dispose();
/// emitter.fire(&"second".to_string());
///
/// assert_eq!(*received.borrow(), vec!["first"]);
/// assert_eq!(emitter.size(), 0);
/// ```
pub struct EventEmitter<T> {
    shared: Rc<Shared<T>>,
}

impl<T> EventEmitter<T> {
    /// Creates an emitter without any listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared::new()),
        }
    }

    /// Returns the subscribe capability of this emitter.
    ///
    /// The returned value does not keep the emitter alive. Subscribing through it after the
    /// emitter has been dropped yields an already disposed [`Subscription`].
    #[must_use]
    pub fn event(&self) -> EmitterEvent<T> {
        EmitterEvent {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Calls every listener that is subscribed at the moment of the call, in subscription order.
    ///
    /// Changes that listeners make to the set of subscriptions while this is running take
    /// effect from the next call onwards.
    pub fn fire(&self, data: &T) {
        let Some(snapshot) = self.shared.snapshot() else {
            return;
        };

        trace!(listeners = snapshot.len(), "firing event");

        for entry in snapshot.iter() {
            (entry.listener)(data);
        }
    }

    /// Number of listeners currently subscribed.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shared.len()
    }

    /// Whether no listeners are currently subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Unsubscribes all listeners.
    ///
    /// Existing [`Subscription`]s stay valid: disposing them afterwards does nothing. A fire that
    /// is in progress when this is called still completes its pass.
    pub fn dispose(&self) {
        self.shared.clear();
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Event<T> for EventEmitter<T>
where
    T: 'static,
{
    fn subscribe_listener(&self, listener: Listener<T>) -> Subscription {
        subscribe_shared(&self.shared, listener)
    }
}

impl<T> Disposable for EventEmitter<T> {
    #[inline]
    fn dispose(&self) {
        Self::dispose(self);
    }
}

impl<T> fmt::Debug for EventEmitter<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

/// The read-only subscribe capability of an [`EventEmitter`].
///
/// Obtained from [`EventEmitter::event()`]. Holds only a weak reference to the emitter, so it can
/// be stored by listeners without creating reference cycles.
pub struct EmitterEvent<T> {
    shared: Weak<Shared<T>>,
}

impl<T> Clone for EmitterEvent<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T> Event<T> for EmitterEvent<T>
where
    T: 'static,
{
    fn subscribe_listener(&self, listener: Listener<T>) -> Subscription {
        let Some(shared) = self.shared.upgrade() else {
            trace!("subscribed to an event whose emitter no longer exists");
            return Subscription::disposed();
        };

        subscribe_shared(&shared, listener)
    }
}

impl<T> fmt::Debug for EmitterEvent<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("is_connected", &(self.shared.strong_count() > 0))
            .finish_non_exhaustive()
    }
}
