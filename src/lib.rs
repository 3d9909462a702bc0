//! Synchronous string-keyed event emitters with a terminal `"end"`/`"error"`
//! convention layered on top.
//!
//! [`Emitter`] is the plain base. [`ExtendedEmitter`] adds catch-all listeners,
//! forwarding between emitters, FIFO deferred emission, the `map`/`map_async`/
//! `flat_map` stage combinators and conversions to and from futures.
//!
//! ```no_run
//! use evno_ex::{END, ExtendedEmitter, map_fn};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), evno_ex::Error> {
//! let source = ExtendedEmitter::new();
//! let doubled = source.map(vec![map_fn(|_, args| {
//!     Ok(json!(args[0].as_i64().unwrap_or_default() * 2).into())
//! })])?;
//!
//! source.emit_async(END, vec![json!(21)]);
//! assert_eq!(doubled.as_promise().await?, json!(42));
//! # Ok(())
//! # }
//! ```

mod bridge;
mod combinator;
mod config;
mod emitter;
mod error;
mod extended;
mod listener;
mod pipe;
mod schedule;
mod value;

#[cfg(test)]
mod testing;

pub use bridge::{Promise, as_promise, from_promise, from_promise_fn, start_async};
pub use combinator::{AsyncFn, Completion, FlatFn, MapFn, Mapped, async_fn, flat_fn, map_fn};
pub use config::Config;
pub use emitter::Emitter;
pub use error::{Error, Violation};
pub use extended::ExtendedEmitter;
pub use listener::{AllCallback, Callback, ListenerId};
pub use pipe::Source;
pub use value::{END, ERROR, Outcome, Value};
