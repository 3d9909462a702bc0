//! Chaining stages off a single upstream `"end"`.
//!
//! 1. `map` turns the upstream values into derived ones.
//! 2. `map_async` hands each function a completion it may call later.
//! 3. `flat_map` waits for the inner emitters it creates.
//! 4. Side events flow through every stage untouched.
use evno_ex::{END, Error, ExtendedEmitter, async_fn, flat_fn, map_fn};
use serde_json::{Value, json};
use std::time::Duration;

fn int(value: &Value) -> i64 {
    value.as_i64().unwrap_or(0)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    let source = ExtendedEmitter::new();

    // 1. Sum and product of the two upstream numbers
    let arithmetic = source.map(vec![
        map_fn(|_, args| Ok(json!(int(&args[0]) + int(&args[1])).into())),
        map_fn(|_, args| Ok(json!(int(&args[0]) * int(&args[1])).into())),
    ])?;

    // 2. Label each value, completing on a later turn
    let labelled = arithmetic.map_async(vec![async_fn(|_, args, done| {
        let args = args.to_vec();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let labels = args.iter().map(|v| json!(format!("value={v}"))).collect();
            done.ok(labels);
        });
    })])?;

    // 3. One inner emitter per stage run, reporting progress before it ends
    let finished = labelled.flat_map(vec![flat_fn(|_, args| {
        let inner = ExtendedEmitter::new();
        inner.emit_async("progress", vec![json!(args.len())]);
        inner.start_pipeline(vec![json!(args)]);
        inner
    })])?;

    // 4. Side events from any stage show up downstream
    finished.on("progress", |args| println!("[progress] {} labels", args[0]));
    finished.on(END, |args| println!("[end] {args:?}"));
    source.emit("hello", &[json!("side event")]);

    source.start_pipeline(vec![json!(4), json!(2)]);
    let result = finished.as_promise().await?;
    println!("[promise] {result}");
    Ok(())
}
