use std::cell::RefCell;
use std::rc::Rc;

use crate::{CancellationToken, Deferred, Event, Subscription, once};

/// Turns the next value fired by `event` into a [`Deferred`] value.
///
/// The deferred value resolves with a clone of the first value fired after this call. It never
/// fails, and it stays pending for as long as the event does not fire.
///
/// The subscription is removed as soon as the value arrives. Dropping the deferred value before
/// that also removes it.
///
/// # Example
///
/// ```rust
/// use emitter::{EventEmitter, to_promise};
/// use futures::executor::block_on;
///
/// let emitter = EventEmitter::<u32>::new();
///
/// let next = to_promise(&emitter.event());
/// emitter.fire(&23);
///
/// assert_eq!(block_on(next), 23);
/// assert_eq!(emitter.size(), 0);
/// ```
pub fn to_promise<T, E>(event: &E) -> Deferred<T>
where
    T: Clone + 'static,
    E: Event<T> + ?Sized,
{
    let (resolver, deferred) = Deferred::pending();

    let subscription = once(event, move |data: &T| {
        resolver.resolve(data.clone());
    });

    deferred.retain(subscription);
    deferred
}

/// Turns the next value fired by `event` into a [`Deferred`] value that can be cancelled.
///
/// Resolves with `Some(value)` if the event fires first, or with `None` if `token` is aborted
/// first. Whichever happens first retracts the other: after the event fires the abort listener is
/// unregistered, and after an abort the event subscription is disposed. Exactly one resolution
/// ever takes place.
///
/// If `token` is already aborted, the returned value is resolved with `None` immediately and
/// nothing is subscribed.
///
/// # Example
///
/// ```rust
/// use emitter::{AbortController, EventEmitter, to_promise_with_signal};
/// use futures::executor::block_on;
///
/// let emitter = EventEmitter::<u32>::new();
/// let controller = AbortController::new();
///
/// let next = to_promise_with_signal(&emitter.event(), &controller.signal());
/// controller.abort();
///
/// assert_eq!(block_on(next), None);
/// assert_eq!(emitter.size(), 0);
/// ```
pub fn to_promise_with_signal<T, E, C>(event: &E, token: &C) -> Deferred<Option<T>>
where
    T: Clone + 'static,
    E: Event<T> + ?Sized,
    C: CancellationToken + ?Sized,
{
    if token.is_aborted() {
        return Deferred::resolved(None);
    }

    let (resolver, deferred) = Deferred::pending();

    // The abort registration only exists after the event subscription, so the fire path finds
    // it through this slot.
    let abort_registration: Rc<RefCell<Option<Subscription>>> = Rc::default();

    let fired = once(event, {
        let resolver = resolver.clone();
        let abort_registration = Rc::clone(&abort_registration);

        move |data: &T| {
            let registration = abort_registration.borrow_mut().take();

            if let Some(registration) = registration {
                registration.dispose();
            }

            resolver.resolve(Some(data.clone()));
        }
    });

    let aborted = token.on_abort(Rc::new({
        let fired = fired.clone();
        let resolver = resolver.clone();

        move || {
            fired.dispose();
            resolver.resolve(None);
        }
    }));

    if resolver.is_resolved() {
        // One of the two paths completed while we were still registering.
        aborted.dispose();
        fired.dispose();
    } else {
        *abort_registration.borrow_mut() = Some(aborted.clone());
    }

    deferred.retain(fired);
    deferred.retain(aborted);
    deferred
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;

    use futures::executor::block_on;

    use super::*;
    use crate::{AbortController, AbortListener, AbortSignal, EventEmitter, Listener};

    /// A token that is never aborted and counts its currently registered listeners.
    #[derive(Default)]
    struct CountingToken {
        registered: Rc<Cell<usize>>,
    }

    impl CancellationToken for CountingToken {
        fn is_aborted(&self) -> bool {
            false
        }

        fn on_abort(&self, _listener: AbortListener) -> Subscription {
            let registered = Rc::clone(&self.registered);
            registered.set(registered.get() + 1);
            Subscription::new(move || registered.set(registered.get() - 1))
        }
    }

    /// A token that aborts as soon as a listener is registered.
    struct ImmediateToken;

    impl CancellationToken for ImmediateToken {
        fn is_aborted(&self) -> bool {
            false
        }

        fn on_abort(&self, listener: AbortListener) -> Subscription {
            listener();
            Subscription::disposed()
        }
    }

    #[test]
    fn resolves_with_next_fired_value() {
        let emitter = EventEmitter::<u32>::new();

        let next = to_promise(&emitter.event());
        assert_eq!(emitter.size(), 1);

        emitter.fire(&23);
        emitter.fire(&24);

        assert_eq!(emitter.size(), 0);
        assert_eq!(block_on(next), 23);
    }

    #[test]
    fn ignores_values_fired_before_the_call() {
        let emitter = EventEmitter::<u32>::new();
        emitter.fire(&1);

        let next = to_promise(&emitter);
        assert!(!next.is_ready());

        emitter.fire(&2);
        assert_eq!(next.into_value().ok(), Some(2));
    }

    #[test]
    fn stays_pending_without_fire() {
        let emitter = EventEmitter::<u32>::new();

        let next = to_promise(&emitter);

        assert!(next.into_value().is_err());
    }

    #[test]
    fn dropping_pending_value_unsubscribes() {
        let emitter = EventEmitter::<u32>::new();

        let next = to_promise(&emitter);
        assert_eq!(emitter.size(), 1);

        drop(next);
        assert_eq!(emitter.size(), 0);
    }

    #[test]
    fn fire_wins_over_later_abort() {
        let emitter = EventEmitter::<String>::new();
        let controller = AbortController::new();
        let signal = controller.signal();

        let next = to_promise_with_signal(&emitter.event(), &signal);
        emitter.fire(&"value".to_string());

        controller.abort();

        assert_eq!(emitter.size(), 0);
        assert_eq!(block_on(next), Some("value".to_string()));
    }

    #[test]
    fn fire_unregisters_abort_listener() {
        let emitter = EventEmitter::<u32>::new();
        let token = CountingToken::default();

        let next = to_promise_with_signal(&emitter, &token);
        assert_eq!(token.registered.get(), 1);

        emitter.fire(&5);

        assert_eq!(token.registered.get(), 0);
        assert_eq!(next.into_value().ok(), Some(Some(5)));
    }

    #[test]
    fn abort_wins_over_later_fire() {
        let emitter = EventEmitter::<u32>::new();
        let controller = AbortController::new();

        let next = to_promise_with_signal(&emitter, &controller.signal());
        assert_eq!(emitter.size(), 1);

        controller.abort();
        assert_eq!(emitter.size(), 0);

        emitter.fire(&9);

        assert_eq!(block_on(next), None);
    }

    #[test]
    fn already_aborted_token_resolves_immediately() {
        let emitter = EventEmitter::<u32>::new();
        let signal = AbortSignal::aborted();

        let next = to_promise_with_signal(&emitter, &signal);

        assert_eq!(emitter.size(), 0);
        assert!(next.is_ready());
        assert_eq!(block_on(next), None);
    }

    #[test]
    fn dropping_pending_value_releases_both_registrations() {
        let emitter = EventEmitter::<u32>::new();
        let token = CountingToken::default();

        let next = to_promise_with_signal(&emitter, &token);
        assert_eq!(emitter.size(), 1);
        assert_eq!(token.registered.get(), 1);

        drop(next);

        assert_eq!(emitter.size(), 0);
        assert_eq!(token.registered.get(), 0);
    }

    #[test]
    fn event_firing_during_subscribe_retracts_abort_listener() {
        let token = CountingToken::default();
        let event = |listener: Listener<u32>| {
            listener(&77);
            Subscription::disposed()
        };

        let next = to_promise_with_signal(&event, &token);

        assert_eq!(token.registered.get(), 0);
        assert_eq!(next.into_value().ok(), Some(Some(77)));
    }

    #[test]
    fn token_aborting_during_registration_resolves_none() {
        let emitter = EventEmitter::<u32>::new();

        let next = to_promise_with_signal(&emitter, &ImmediateToken);

        assert_eq!(emitter.size(), 0);
        assert_eq!(next.into_value().ok(), Some(None));
    }

    #[test]
    fn works_with_dyn_event_and_token() {
        let emitter = EventEmitter::<u32>::new();
        let controller = AbortController::new();
        let signal = controller.signal();

        let event: &dyn Event<u32> = &emitter;
        let token: &dyn CancellationToken = &signal;

        let next = to_promise_with_signal(event, token);
        emitter.fire(&3);

        assert_eq!(next.into_value().ok(), Some(Some(3)));
    }
}
