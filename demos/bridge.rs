//! Moving between futures and the `"end"`/`"error"` convention.
//!
//! - `from_promise` wraps a future into an emitter.
//! - `start_async` runs a synchronous producer on a later turn.
//! - `pipe_as_promise` forwards side events and awaits the terminal one.
use evno_ex::{END, ERROR, Emitter, ExtendedEmitter, as_promise, from_promise, start_async};
use serde_json::{Value, json};
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Future -> emitter -> future
    let fetched = from_promise(async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok::<_, Value>(json!({"id": 7}))
    });
    match fetched.as_promise().await {
        Ok(value) => println!("[from_promise] resolved with {value}"),
        Err(e) => println!("[from_promise] {} ({})", e, e.as_label()),
    }

    // A failing producer surfaces as an OperationFailure
    let failing = start_async(|this| {
        this.emit("log", &[json!("about to fail")]);
        Err(json!("disk full"))
    });
    failing.on("log", |args| println!("[start_async] log: {}", args[0]));
    if let Err(e) = failing.as_promise().await {
        println!("[start_async] {} ({})", e, e.as_label());
    }

    // A plain emitter piped into an extended one
    let plain = Emitter::new();
    let relay = ExtendedEmitter::new();
    relay.on("tick", |args| println!("[relay] tick {}", args[0]));
    let done = relay.pipe_as_promise(&plain);
    for i in 0..3 {
        plain.emit("tick", &[json!(i)]);
    }
    plain.emit(END, &[json!("finished")]);
    println!("[pipe_as_promise] {:?}", done.await);

    // Errors need an observer; as_promise counts as one
    let plain = Emitter::new();
    let observed = as_promise(&plain);
    plain.emit(ERROR, &[json!("late failure")]);
    println!("[as_promise] {:?}", observed.await);
}
