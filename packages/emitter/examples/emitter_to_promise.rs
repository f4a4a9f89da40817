//! Awaiting the next value of an event, with and without cancellation.

use emitter::{AbortController, EventEmitter, to_promise, to_promise_with_signal};
use futures::executor::block_on;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "emitter=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let connected = EventEmitter::<u16>::new();

    let next_port = to_promise(&connected.event());
    connected.fire(&8080);
    println!("connected on port {}", block_on(next_port));

    let controller = AbortController::new();
    let signal = controller.signal();

    let next_port = to_promise_with_signal(&connected.event(), &signal);
    controller.abort_with_reason("user cancelled");

    match block_on(next_port) {
        Some(port) => println!("connected on port {port}"),
        None => println!(
            "gave up waiting: {}",
            signal.reason().unwrap_or_default()
        ),
    }

    if let Err(error) = signal.throw_if_aborted() {
        println!("further work refused: {error}");
    }

    println!("{} listeners remain", connected.size());
}
