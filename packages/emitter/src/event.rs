use std::rc::Rc;

use crate::{DisposableStore, Subscription};

/// A callback that is invoked with every value fired by an [`Event`].
pub type Listener<T> = Rc<dyn Fn(&T)>;

/// The capability to subscribe to a stream of values of type `T`.
///
/// This is the contract that combinators such as [`once()`][crate::once] and
/// [`to_promise()`][crate::to_promise] are written against. It is implemented by
/// [`EventEmitter`][crate::EventEmitter], by the read-only [`EmitterEvent`][crate::EmitterEvent]
/// that an emitter hands out and by any closure of the shape
/// `Fn(Listener<T>) -> Subscription`, which makes test doubles trivial to write.
///
/// Only [`subscribe_listener()`][Self::subscribe_listener] needs to be implemented. The other
/// methods are conveniences layered on top of it.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use emitter::{Listener, Subscription, once};
///
/// // An event that delivers a single value as soon as someone subscribes.
/// let immediate = |listener: Listener<u32>| {
///     listener(&42);
///     Subscription::disposed()
/// };
///
/// let received = Rc::new(RefCell::new(Vec::new()));
/// once(&immediate, {
///     let received = Rc::clone(&received);
///     move |value: &u32| received.borrow_mut().push(*value)
/// });
///
/// assert_eq!(*received.borrow(), vec![42]);
/// ```
pub trait Event<T> {
    /// Registers `listener` and returns the handle that unregisters it.
    ///
    /// Each call creates an independent registration, even when the same listener is registered
    /// more than once.
    fn subscribe_listener(&self, listener: Listener<T>) -> Subscription;

    /// Registers a closure as a listener.
    fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.subscribe_listener(Rc::new(listener))
    }

    /// Registers a listener that is invoked with `context` alongside every fired value.
    fn subscribe_bound<C>(&self, context: C, listener: impl Fn(&C, &T) + 'static) -> Subscription
    where
        Self: Sized,
        C: 'static,
        T: 'static,
    {
        self.subscribe_listener(Rc::new(move |data: &T| listener(&context, data)))
    }

    /// Registers a closure as a listener and also adds the returned handle to `store`, so the
    /// subscription is released when the store is disposed.
    fn subscribe_into(
        &self,
        listener: impl Fn(&T) + 'static,
        store: &DisposableStore,
    ) -> Subscription
    where
        Self: Sized,
    {
        let subscription = self.subscribe_listener(Rc::new(listener));
        store.add(subscription.clone());
        subscription
    }
}

impl<T, F> Event<T> for F
where
    F: Fn(Listener<T>) -> Subscription,
{
    #[inline]
    fn subscribe_listener(&self, listener: Listener<T>) -> Subscription {
        self(listener)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::Disposable;

    /// Records every listener handed to it and lets the test fire them by hand.
    #[derive(Default)]
    struct RecordingEvent {
        listeners: RefCell<Vec<Listener<u32>>>,
    }

    impl RecordingEvent {
        fn fire(&self, value: u32) {
            let listeners = self.listeners.borrow().clone();

            for listener in listeners {
                listener(&value);
            }
        }
    }

    impl Event<u32> for RecordingEvent {
        fn subscribe_listener(&self, listener: Listener<u32>) -> Subscription {
            self.listeners.borrow_mut().push(listener);
            Subscription::disposed()
        }
    }

    #[test]
    fn subscribe_wraps_closure() {
        let event = RecordingEvent::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        event.subscribe({
            let seen = Rc::clone(&seen);
            move |value| seen.borrow_mut().push(*value)
        });
        event.fire(7);

        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn subscribe_bound_passes_context() {
        let event = RecordingEvent::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        event.subscribe_bound(Rc::clone(&seen), |seen, value| {
            seen.borrow_mut().push(*value * 10);
        });
        event.fire(3);

        assert_eq!(*seen.borrow(), vec![30]);
    }

    #[test]
    fn subscribe_into_registers_handle_in_store() {
        let released = Rc::new(RefCell::new(false));
        let event = {
            let released = Rc::clone(&released);
            move |_listener: Listener<u32>| {
                let released = Rc::clone(&released);
                Subscription::new(move || *released.borrow_mut() = true)
            }
        };
        let store = DisposableStore::new();

        let subscription = event.subscribe_into(|_| {}, &store);
        assert_eq!(store.len(), 1);
        assert!(!subscription.is_disposed());

        store.dispose();

        assert!(*released.borrow());
        assert!(subscription.is_disposed());
    }

    #[test]
    fn closure_is_an_event() {
        let calls = Rc::new(RefCell::new(0));
        let event = {
            let calls = Rc::clone(&calls);
            move |listener: Listener<u32>| {
                *calls.borrow_mut() += 1;
                listener(&1);
                Subscription::disposed()
            }
        };

        let seen = Rc::new(RefCell::new(Vec::new()));
        event.subscribe({
            let seen = Rc::clone(&seen);
            move |value| seen.borrow_mut().push(*value)
        });

        assert_eq!(*calls.borrow(), 1);
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn dyn_event_is_usable() {
        let event = RecordingEvent::default();
        let dyn_event: &dyn Event<u32> = &event;
        let seen = Rc::new(RefCell::new(Vec::new()));

        let listener: Listener<u32> = {
            let seen = Rc::clone(&seen);
            Rc::new(move |value: &u32| seen.borrow_mut().push(*value))
        };
        dyn_event.subscribe_listener(listener);
        event.fire(5);

        assert_eq!(*seen.borrow(), vec![5]);
    }
}
