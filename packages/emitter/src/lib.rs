#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Typed, single-threaded event emitters with disposable subscriptions.
//!
//! An [`EventEmitter<T>`] keeps an ordered set of listeners and calls each of them synchronously
//! whenever a value is fired. Subscribing goes through the [`Event<T>`] trait and returns a
//! [`Subscription`] that removes exactly that registration when disposed.
//!
//! On top of the [`Event<T>`] contract this crate provides a few combinators:
//!
//! * [`once()`] - deliver only the next value to a listener, then unsubscribe.
//! * [`to_promise()`] - turn the next value into a [`Deferred`] value that can be awaited.
//! * [`to_promise_with_signal()`] - the same, but abandoned when a [`CancellationToken`] such as
//!   an [`AbortSignal`] is aborted.
//!
//! Firing is reentrancy-safe: listeners may subscribe, unsubscribe, fire again or dispose the
//! emitter while a fire is in progress. Each fire walks the listener set as it was when the fire
//! started.
//!
//! All types in this crate are single-threaded (`!Send` and `!Sync`).
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use emitter::{Event, EventEmitter};
//!
//! let emitter = EventEmitter::<&str>::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let a = emitter.subscribe({
//!     let log = Rc::clone(&log);
//!     move |value: &&str| log.borrow_mut().push(format!("a:{value}"))
//! });
//! emitter.subscribe({
//!     let log = Rc::clone(&log);
//!     move |value: &&str| log.borrow_mut().push(format!("b:{value}"))
//! });
//!
//! emitter.fire(&"one");
//! a.dispose();
//! emitter.fire(&"two");
//!
//! assert_eq!(*log.borrow(), vec!["a:one", "b:one", "b:two"]);
//! ```
//!
//! # Awaiting the next value
//!
//! ```rust
//! use emitter::{AbortController, EventEmitter, to_promise_with_signal};
//! use futures::executor::block_on;
//!
//! let emitter = EventEmitter::<u32>::new();
//! let controller = AbortController::new();
//!
//! let next = to_promise_with_signal(&emitter.event(), &controller.signal());
//! emitter.fire(&7);
//!
//! assert_eq!(block_on(next), Some(7));
//! ```

mod abort;
mod deferred;
mod disposable;
mod emitter;
mod error;
mod event;
mod once;
mod to_promise;

pub use abort::*;
pub use deferred::*;
pub use disposable::*;
pub use emitter::*;
pub use error::*;
pub use event::*;
pub use once::*;
pub use to_promise::*;
