use super::gather::{Gather, Report, Slot};
use super::{ensure_functions, settle, stage};
use crate::{Error, Violation};
use crate::extended::ExtendedEmitter;
use crate::value::{END, is_failure};
use serde_json::Value;
use std::sync::Arc;

/// A `map_async` function: reports its result through the [`Completion`] it is
/// given, synchronously or later.
pub type AsyncFn = Arc<dyn Fn(&ExtendedEmitter, &[Value], Completion) + Send + Sync>;

#[inline]
pub fn async_fn<F>(f: F) -> AsyncFn
where
    F: Fn(&ExtendedEmitter, &[Value], Completion) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Result callback for one `map_async` position. Must be completed exactly once.
#[derive(Clone)]
pub struct Completion {
    position: usize,
    gather: Arc<Gather>,
    out: ExtendedEmitter,
}

impl Completion {
    pub fn position(&self) -> usize {
        self.position
    }

    /// Reports this position's result.
    ///
    /// `None` and `Some(Value::Null)` mean success with `values`; any other reason,
    /// `false`, `0` and `""` included, is a failure carrying `values` as extra
    /// arguments.
    ///
    /// # Panics
    /// Panics with [`Error::ProtocolViolation`] when called a second time.
    pub fn complete(&self, reason: Option<Value>, values: Vec<Value>) {
        let slot = if is_failure(&reason) {
            Slot::Failed(std::iter::once(reason.unwrap_or_default()).chain(values).collect())
        } else {
            Slot::Done(values)
        };

        match self.gather.fill(self.position, slot) {
            Ok(true) => settle(&self.out, self.gather.outcome(Report::Full), "map_async"),
            Ok(false) => {}
            Err(_) => panic!(
                "{}",
                Error::ProtocolViolation(Violation::CallbackRepeated(self.position))
            ),
        }
    }

    /// Shorthand for a successful [`complete`](Self::complete).
    pub fn ok(&self, values: Vec<Value>) {
        self.complete(None, values)
    }
}

impl ExtendedEmitter {
    /// Derives a stage whose `"end"` carries every function's completion values,
    /// concatenated by position, once all positions have completed.
    ///
    /// The first failure by position becomes the stage's `"error"`, with its extra
    /// values.
    ///
    /// Fails with [`Error::InvalidArgument`] when `funcs` is empty.
    pub fn map_async(&self, funcs: Vec<AsyncFn>) -> Result<ExtendedEmitter, Error> {
        ensure_functions("map_async", funcs.len())?;

        let out = stage(self);
        let target = out.clone();
        self.on(END, move |args| {
            let gather = Arc::new(Gather::new(funcs.len()));
            for (position, f) in funcs.iter().enumerate() {
                let completion = Completion {
                    position,
                    gather: Arc::clone(&gather),
                    out: target.clone(),
                };
                f(&target, args, completion);
            }
        });
        Ok(out)
    }
}
