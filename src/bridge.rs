//! Conversions between the `"end"`/`"error"` convention and futures.

use crate::Error;
use crate::extended::ExtendedEmitter;
use crate::pipe::Source;
use crate::schedule;
use crate::value::{END, ERROR, first_or_null};
use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Single-resolution result of an emitter's terminal event.
pub type Promise = BoxFuture<'static, Result<Value, Error>>;

/// Resolves with the first `"end"` value, or fails with the `"error"` reason.
///
/// Further end values and extra error arguments are dropped. Fails with
/// [`Error::Abandoned`] if the emitter goes away without a terminal event.
pub fn as_promise(source: impl Into<Source>) -> Promise {
    let source = source.into();
    let (tx, rx) = oneshot::channel::<Result<Value, Error>>();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let on_end = Arc::clone(&tx);
    source.on(END, move |args| settle(&on_end, Ok(first_or_null(args))));
    source.on(ERROR, move |args| {
        settle(
            &tx,
            Err(Error::OperationFailure {
                reason: first_or_null(args),
                extra: Vec::new(),
            }),
        )
    });

    async move { rx.await.unwrap_or(Err(Error::Abandoned)) }.boxed()
}

fn settle(
    tx: &Mutex<Option<oneshot::Sender<Result<Value, Error>>>>,
    result: Result<Value, Error>,
) {
    if let Some(tx) = tx.lock().take() {
        let _ = tx.send(result);
    }
}

/// Emits `"end"(value)` or `"error"(reason)` once `future` settles.
///
/// # Panics
/// Panics with [`Error::UnsupportedRuntime`] outside a current-thread Tokio runtime.
pub fn from_promise<F, V, E>(future: F) -> ExtendedEmitter
where
    F: Future<Output = Result<V, E>> + Send + 'static,
    V: Into<Value> + 'static,
    E: Into<Value> + 'static,
{
    let emitter = ExtendedEmitter::new();
    schedule::spawn(settle_on(emitter.clone(), future));
    emitter
}

/// Calls `f` with a new emitter on a later turn and bridges the future it returns
/// like [`from_promise`].
pub fn from_promise_fn<F, Fut, V, E>(f: F) -> ExtendedEmitter
where
    F: FnOnce(ExtendedEmitter) -> Fut + Send + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    V: Into<Value> + 'static,
    E: Into<Value> + 'static,
{
    let emitter = ExtendedEmitter::new();
    let this = emitter.clone();
    emitter.schedule(move || {
        let future = f(this.clone());
        schedule::spawn(settle_on(this, future));
    });
    emitter
}

async fn settle_on<F, V, E>(emitter: ExtendedEmitter, future: F)
where
    F: Future<Output = Result<V, E>>,
    V: Into<Value> + 'static,
    E: Into<Value> + 'static,
{
    match future.await {
        Ok(value) => emitter.emit(END, &[value.into()]),
        Err(reason) => emitter.emit(ERROR, &[reason.into()]),
    };
}

/// Returns a new emitter at once and runs `f` with it on a later turn.
///
/// An `Err` returned by `f` is emitted as `"error"`.
pub fn start_async<F>(f: F) -> ExtendedEmitter
where
    F: FnOnce(&ExtendedEmitter) -> Result<(), Value> + Send + 'static,
{
    let emitter = ExtendedEmitter::new();
    let this = emitter.clone();
    emitter.schedule(move || {
        if let Err(reason) = f(&this) {
            tracing::debug!(%reason, "start_async callback failed");
            this.emit(ERROR, &[reason]);
        }
    });
    emitter
}

impl ExtendedEmitter {
    /// See [`as_promise`].
    pub fn as_promise(&self) -> Promise {
        as_promise(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Emitter;
    use crate::testing::channel;
    use futures::future;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn as_promise_resolves_with_first_end_value() {
        for source in [
            Source::Plain(Emitter::new()),
            Source::Extended(ExtendedEmitter::new()),
        ] {
            let promise = as_promise(source.clone());
            source.emit(END, &[json!(1), json!(2)]);
            assert_eq!(promise.await.unwrap(), json!(1));
        }
    }

    #[tokio::test]
    async fn as_promise_rejects_with_error_reason() {
        for source in [
            Source::Plain(Emitter::new()),
            Source::Extended(ExtendedEmitter::new()),
        ] {
            let promise = as_promise(source.clone());
            source.emit(ERROR, &[json!("boom"), json!("extra")]);
            let err = promise.await.unwrap_err();
            assert_eq!(
                err,
                Error::OperationFailure {
                    reason: json!("boom"),
                    extra: vec![]
                }
            );
        }
    }

    #[tokio::test]
    async fn as_promise_of_empty_end_is_null() {
        let emitter = ExtendedEmitter::new();
        let promise = emitter.as_promise();
        emitter.start_pipeline(vec![]);
        assert_eq!(promise.await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn as_promise_fails_when_emitter_is_dropped() {
        let promise = as_promise(ExtendedEmitter::new());
        assert_eq!(promise.await.unwrap_err(), Error::Abandoned);
    }

    #[tokio::test]
    async fn from_promise_round_trip() {
        let emitter = from_promise(async { Ok::<_, Value>(42) });
        assert_eq!(emitter.as_promise().await.unwrap(), json!(42));

        let emitter = from_promise(async { Err::<Value, _>("nope") });
        let err = as_promise(&emitter).await.unwrap_err();
        assert_eq!(Value::from(err), json!("nope"));
    }

    #[tokio::test]
    async fn ready_future_waits_for_late_subscribers() {
        let resolved = from_promise(future::ready(Ok::<_, Value>(json!(42))));
        let rejected = from_promise(future::ready(Err::<Value, _>(json!("early"))));
        std::thread::sleep(Duration::from_millis(20));

        let (resolved, rejected) = (resolved.as_promise(), rejected.as_promise());
        assert_eq!(resolved.await.unwrap(), json!(42));
        assert_eq!(Value::from(rejected.await.unwrap_err()), json!("early"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[should_panic(expected = "deferred work needs a current-thread Tokio runtime")]
    async fn from_promise_rejects_multi_thread_runtime() {
        from_promise(future::ready(Ok::<_, Value>(json!(42))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[should_panic(expected = "deferred work needs a current-thread Tokio runtime")]
    async fn start_async_rejects_multi_thread_runtime() {
        start_async(|_| Ok(()));
    }

    #[tokio::test]
    async fn from_promise_fn_receives_its_emitter() {
        let emitter = from_promise_fn(|this: ExtendedEmitter| async move {
            this.emit("progress", &[json!(50)]);
            Ok::<_, Value>(json!("done"))
        });
        let (listener, mut progress) = channel();
        emitter.on("progress", listener);
        let promise = emitter.as_promise();

        assert_eq!(promise.await.unwrap(), json!("done"));
        assert_eq!(progress.recv().await.unwrap(), vec![json!(50)]);
    }

    #[tokio::test]
    async fn start_async_runs_later_with_the_returned_emitter() {
        let emitter = start_async(|this| {
            this.emit(END, &[json!("ok")]);
            Ok(())
        });
        let (listener, mut rx) = channel();
        emitter.on(END, listener);
        assert_eq!(rx.recv().await.unwrap(), vec![json!("ok")]);
    }

    #[tokio::test]
    async fn start_async_turns_failure_into_error_event() {
        let emitter = start_async(|_| Err(json!("failed")));
        let err = emitter.as_promise().await.unwrap_err();
        assert_eq!(err.as_label(), "operation_failure");
        assert_eq!(Value::from(err), json!("failed"));
    }

    #[tokio::test]
    async fn pipe_as_promise_forwards_side_events_only() {
        let target = ExtendedEmitter::new();
        let source = ExtendedEmitter::new();
        let (side, mut side_rx) = channel();
        let (ends, mut end_rx) = channel();
        target.on("info", side);
        target.on(END, ends);

        let promise = target.pipe_as_promise(&source);
        source.emit("info", &[json!("i")]);
        source.emit(END, &[json!(7)]);

        assert_eq!(promise.await.unwrap(), json!(7));
        assert_eq!(side_rx.recv().await.unwrap(), vec![json!("i")]);
        assert!(end_rx.try_recv().is_err());
    }
}
