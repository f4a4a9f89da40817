//! Cancellation tokens for [`to_promise_with_signal()`][crate::to_promise_with_signal].
//!
//! [`CancellationToken`] is the narrow contract the combinators consume. [`AbortController`] and
//! [`AbortSignal`] are the implementation shipped with this crate: the controller triggers the
//! abort, the signal is handed to whoever needs to observe it.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::{Error, Event, EventEmitter, Result, Subscription};

/// A callback invoked when a [`CancellationToken`] is aborted.
pub type AbortListener = Rc<dyn Fn()>;

/// Something that can signal that an operation should be abandoned.
pub trait CancellationToken {
    /// Whether the token has already been aborted.
    fn is_aborted(&self) -> bool;

    /// Registers `listener` to be called when the token is aborted.
    ///
    /// Disposing the returned [`Subscription`] unregisters the listener. Implementations are not
    /// required to call listeners registered after the token has already been aborted.
    fn on_abort(&self, listener: AbortListener) -> Subscription;
}

struct AbortState {
    is_aborted: Cell<bool>,
    reason: RefCell<Option<String>>,
    listeners: EventEmitter<()>,
}

impl AbortState {
    fn new() -> Self {
        Self {
            is_aborted: Cell::new(false),
            reason: RefCell::new(None),
            listeners: EventEmitter::new(),
        }
    }

    fn abort(&self, reason: Option<String>) {
        if self.is_aborted.replace(true) {
            return;
        }

        debug!(
            reason = reason.as_deref(),
            listeners = self.listeners.size(),
            "abort signaled"
        );

        *self.reason.borrow_mut() = reason;

        // An abort happens only once, so the listeners are released right after being notified.
        self.listeners.fire(&());
        self.listeners.dispose();
    }
}

/// The observing side of an [`AbortController`].
///
/// Clones observe the same controller.
///
/// # Example
///
/// ```rust
/// use emitter::AbortController;
///
/// let controller = AbortController::new();
/// let signal = controller.signal();
///
/// assert!(signal.throw_if_aborted().is_ok());
///
/// controller.abort_with_reason("shutting down");
///
/// assert!(signal.is_aborted());
/// assert_eq!(signal.reason().as_deref(), Some("shutting down"));
/// assert!(signal.throw_if_aborted().is_err());
/// ```
#[derive(Clone)]
pub struct AbortSignal {
    state: Rc<AbortState>,
}

impl AbortSignal {
    fn new() -> Self {
        Self {
            state: Rc::new(AbortState::new()),
        }
    }

    /// Creates a signal that is already aborted.
    #[must_use]
    pub fn aborted() -> Self {
        let signal = Self::new();
        signal.state.abort(None);
        signal
    }

    /// Whether the signal has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.is_aborted.get()
    }

    /// The reason given when aborting, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.state.reason.borrow().clone()
    }

    /// Returns an error if the signal has been aborted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Aborted`] carrying the abort reason if the signal has been aborted.
    pub fn throw_if_aborted(&self) -> Result<()> {
        if self.is_aborted() {
            return Err(Error::Aborted {
                reason: self.reason(),
            });
        }

        Ok(())
    }

    /// Registers `listener` to be called once when the signal is aborted.
    ///
    /// If the signal is already aborted, the listener is not registered and an already disposed
    /// [`Subscription`] is returned.
    pub fn on_abort(&self, listener: impl Fn() + 'static) -> Subscription {
        if self.is_aborted() {
            return Subscription::disposed();
        }

        self.state.listeners.subscribe(move |_| listener())
    }
}

impl CancellationToken for AbortSignal {
    #[inline]
    fn is_aborted(&self) -> bool {
        Self::is_aborted(self)
    }

    fn on_abort(&self, listener: AbortListener) -> Subscription {
        Self::on_abort(self, move || listener())
    }
}

impl fmt::Debug for AbortSignal {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("is_aborted", &self.is_aborted())
            .field("reason", &self.reason())
            .finish_non_exhaustive()
    }
}

/// Triggers cancellation of the operations observing its [`AbortSignal`].
#[derive(Debug)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// Creates a controller whose signal is not aborted yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signal: AbortSignal::new(),
        }
    }

    /// Returns the signal controlled by this controller.
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Aborts the signal without giving a reason.
    ///
    /// Abort listeners are called in the order they were registered. Only the first abort (with
    /// or without a reason) has any effect.
    pub fn abort(&self) {
        self.signal.state.abort(None);
    }

    /// Aborts the signal, recording `reason`.
    ///
    /// Only the first abort (with or without a reason) has any effect.
    pub fn abort_with_reason(&self, reason: impl Into<String>) {
        self.signal.state.abort(Some(reason.into()));
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}
