//! # Combinators deriving a new stage from an upstream `"end"`.
//!
//! Every combinator returns a fresh output emitter that:
//! - receives every upstream event except `"end"` (including `"error"`);
//! - runs its functions each time upstream emits `"end"`;
//! - emits its own single `"end"` or `"error"` once every function has settled.
//!
//! ```text
//! upstream ──"end"(A)──► f0(A) ─┐
//!          │             f1(A) ─┼─► gather by position ─► out."end"(r0.., r1.., rN..)
//!          │             fN(A) ─┘                    └──► out."error"(first failure)
//!          └──other kinds──────────────────────────────► out
//! ```
//!
//! | Combinator   | Function returns                       | Failure reported as        |
//! |--------------|----------------------------------------|----------------------------|
//! | `map`        | `Result<Mapped, Value>`                 | reason                     |
//! | `map_async`  | nothing; calls its [`Completion`] once | reason + extra values      |
//! | `flat_map`   | a [`Source`](crate::Source)            | reason (extras when single)|

mod flat_map;
mod gather;
mod map;
mod map_async;

pub use flat_map::{FlatFn, flat_fn};
pub use map::{MapFn, Mapped, map_fn};
pub use map_async::{AsyncFn, Completion, async_fn};

use crate::Error;
use crate::extended::ExtendedEmitter;
use crate::value::{END, Outcome};

fn ensure_functions(combinator: &str, count: usize) -> Result<(), Error> {
    if count == 0 {
        return Err(Error::invalid(format!(
            "{combinator} needs at least one function"
        )));
    }
    Ok(())
}

/// Output emitter of a combinator, already receiving upstream's non-terminal events.
fn stage(upstream: &ExtendedEmitter) -> ExtendedEmitter {
    let out = ExtendedEmitter::with_config(upstream.config().clone());
    out.pipe_except([END], upstream);
    out
}

fn settle(out: &ExtendedEmitter, outcome: Outcome, combinator: &'static str) {
    tracing::debug!(combinator, kind = outcome.kind(), "stage settled");
    outcome.emit_on(out);
}
