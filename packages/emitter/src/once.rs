use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use crate::{Event, Subscription};

struct OnceState<F> {
    // Taken by the first invocation; `None` afterwards.
    listener: RefCell<Option<F>>,

    // Filled in as soon as the subscription exists.
    subscription: OnceCell<Subscription>,
}

/// Subscribes `listener` to `event` for a single invocation.
///
/// The first value fired after subscribing is delivered to `listener`, after which the
/// subscription disposes itself. The listener is never called more than once, even if the event
/// fires again from within the listener.
///
/// The returned [`Subscription`] can be used to cancel before anything has been fired.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use emitter::{EventEmitter, once};
///
/// let emitter = EventEmitter::<u32>::new();
/// let received = Rc::new(RefCell::new(Vec::new()));
///
/// once(&emitter.event(), {
///     let received = Rc::clone(&received);
///     move |value: &u32| received.borrow_mut().push(*value)
/// });
///
/// emitter.fire(&1);
/// emitter.fire(&2);
///
/// assert_eq!(*received.borrow(), vec![1]);
/// assert_eq!(emitter.size(), 0);
/// ```
pub fn once<T, E>(event: &E, listener: impl FnOnce(&T) + 'static) -> Subscription
where
    T: 'static,
    E: Event<T> + ?Sized,
{
    let state = Rc::new(OnceState {
        listener: RefCell::new(Some(listener)),
        subscription: OnceCell::new(),
    });

    let subscription = event.subscribe_listener(Rc::new({
        let state = Rc::clone(&state);
        move |data: &T| {
            let Some(listener) = state.listener.borrow_mut().take() else {
                return;
            };

            if let Some(subscription) = state.subscription.get() {
                subscription.dispose();
            }

            listener(data);
        }
    }));

    // An event may deliver a value while we are still subscribing, before the wrapper above
    // could know its own subscription. In that case we clean up here instead.
    let fired_during_subscribe = state.listener.borrow().is_none();

    if fired_during_subscribe {
        subscription.dispose();
    } else {
        state.subscription.get_or_init(|| subscription.clone());
    }

    subscription
}
