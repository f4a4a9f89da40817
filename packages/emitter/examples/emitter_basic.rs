//! Subscribing, firing and unsubscribing with an event emitter.
//!
//! Run with `RUST_LOG=emitter=trace` to see the emitter's own diagnostics.

use std::cell::RefCell;
use std::rc::Rc;

use emitter::{Disposable, DisposableStore, Event, EventEmitter, once};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// A document that tells interested parties whenever its text changes.
struct Document {
    text: RefCell<String>,
    changed: EventEmitter<String>,
}

impl Document {
    fn new() -> Self {
        Self {
            text: RefCell::new(String::new()),
            changed: EventEmitter::new(),
        }
    }

    fn edit(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
        self.changed.fire(&self.text.borrow());
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "emitter=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let document = Document::new();
    let on_changed = document.changed.event();

    // A view that lives as long as its store.
    let view = DisposableStore::new();
    let edits_seen = Rc::new(RefCell::new(0_usize));

    on_changed.subscribe_into(
        {
            let edits_seen = Rc::clone(&edits_seen);
            move |text: &String| {
                *edits_seen.borrow_mut() += 1;
                println!("view: document is now {text:?}");
            }
        },
        &view,
    );

    once(&on_changed, |text: &String| {
        println!("first edit ever: {text:?}");
    });

    document.edit("hello");
    document.edit("hello world");

    view.dispose();
    document.edit("nobody is watching");

    println!(
        "view saw {} edits, {} listeners remain",
        edits_seen.borrow(),
        document.changed.size()
    );
}
