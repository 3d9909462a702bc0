use super::{ensure_functions, settle, stage};
use crate::Error;
use crate::extended::ExtendedEmitter;
use crate::schedule;
use crate::value::{END, Outcome, spread};
use futures::future::{self, BoxFuture, FutureExt, TryFutureExt, join_all};
use serde_json::Value;
use std::sync::Arc;

/// What a `map` function produced for its position.
pub enum Mapped {
    Values(Vec<Value>),
    /// Awaited before the stage settles; the resolved value spreads like
    /// [`Mapped::from`].
    Future(BoxFuture<'static, Result<Value, Value>>),
}

impl Mapped {
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        Mapped::Future(future.boxed())
    }
}

impl From<Value> for Mapped {
    /// An array becomes several values, anything else a single one.
    fn from(value: Value) -> Self {
        Mapped::Values(spread(value))
    }
}

impl From<Vec<Value>> for Mapped {
    fn from(values: Vec<Value>) -> Self {
        Mapped::Values(values)
    }
}

/// A `map` function: called with the output stage and the upstream `"end"` values.
/// `Err(reason)` fails the stage.
pub type MapFn = Arc<dyn Fn(&ExtendedEmitter, &[Value]) -> Result<Mapped, Value> + Send + Sync>;

#[inline]
pub fn map_fn<F>(f: F) -> MapFn
where
    F: Fn(&ExtendedEmitter, &[Value]) -> Result<Mapped, Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

enum Attempt {
    Ready(Result<Vec<Value>, Value>),
    Pending(BoxFuture<'static, Result<Value, Value>>),
}

impl ExtendedEmitter {
    /// Derives a stage whose `"end"` carries every function's result, concatenated
    /// in function order.
    ///
    /// Plain results settle the stage synchronously; if any function returned a
    /// future, the stage settles once all of them have, on a task of the
    /// current-thread Tokio runtime. The first failure in function order becomes the
    /// stage's `"error"`.
    ///
    /// Fails with [`Error::InvalidArgument`] when `funcs` is empty.
    pub fn map(&self, funcs: Vec<MapFn>) -> Result<ExtendedEmitter, Error> {
        ensure_functions("map", funcs.len())?;

        let out = stage(self);
        let target = out.clone();
        self.on(END, move |args| run(&target, &funcs, args));
        Ok(out)
    }
}

fn run(out: &ExtendedEmitter, funcs: &[MapFn], args: &[Value]) {
    let attempts: Vec<Attempt> = funcs
        .iter()
        .map(|f| match f(out, args) {
            Ok(Mapped::Values(values)) => Attempt::Ready(Ok(values)),
            Ok(Mapped::Future(future)) => Attempt::Pending(future),
            Err(reason) => Attempt::Ready(Err(reason)),
        })
        .collect();

    if attempts.iter().all(|a| matches!(a, Attempt::Ready(_))) {
        let results = attempts
            .into_iter()
            .filter_map(|a| match a {
                Attempt::Ready(result) => Some(result),
                Attempt::Pending(_) => None,
            })
            .collect();
        finish(out, results);
        return;
    }

    let futures: Vec<BoxFuture<'static, Result<Vec<Value>, Value>>> = attempts
        .into_iter()
        .map(|a| match a {
            Attempt::Ready(result) => future::ready(result).boxed(),
            Attempt::Pending(future) => future.map_ok(spread).boxed(),
        })
        .collect();
    let out = out.clone();
    schedule::spawn(async move {
        let results = join_all(futures).await;
        finish(&out, results);
    });
}

fn finish(out: &ExtendedEmitter, results: Vec<Result<Vec<Value>, Value>>) {
    let outcome = match results.into_iter().collect::<Result<Vec<_>, _>>() {
        Ok(values) => Outcome::End(values.into_iter().flatten().collect()),
        Err(reason) => Outcome::Error {
            reason,
            extra: Vec::new(),
        },
    };
    settle(out, outcome, "map");
}
