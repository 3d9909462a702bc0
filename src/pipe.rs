//! # Forwarding events from a source emitter onto an [`ExtendedEmitter`].
//!
//! ```text
//! Source::Extended ── on_all_except(excluded) ─────────────────► target.emit(kind)
//! Source::Plain    ── emit ─► [prev stages] ─► Piped stage ────► target.emit(kind)   (kind != "error")
//!                  └─ on("error") ────────────────────────────► target.emit("error")
//! ```
//!
//! ## Rules
//! - The source's own listeners run first; forwarding happens after them.
//! - Every pipe is independent: several targets per source and several sources per
//!   target all fire.
//! - Piping a plain source marks its `"error"` as observed unless `"error"` is
//!   excluded; the error then has to be handled on the target.

use crate::bridge::{self, Promise};
use crate::emitter::{Dispatch, Emitter, Table};
use crate::extended::ExtendedEmitter;
use crate::listener::{ListenerId, kinds};
use crate::value::{END, ERROR};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Anything that can be piped, bridged or returned from a `flat_map` function.
#[derive(Clone)]
pub enum Source {
    Extended(ExtendedEmitter),
    Plain(Emitter),
}

impl Source {
    pub fn on<F>(&self, kind: impl Into<String>, f: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        match self {
            Source::Extended(emitter) => emitter.on(kind, f),
            Source::Plain(emitter) => emitter.on(kind, f),
        }
    }

    pub fn emit(&self, kind: &str, args: &[Value]) -> bool {
        match self {
            Source::Extended(emitter) => emitter.emit(kind, args),
            Source::Plain(emitter) => emitter.emit(kind, args),
        }
    }

    /// Every listener that would receive `kind`; plain emitters have no except-all
    /// listeners.
    pub fn listener_count(&self, kind: &str) -> usize {
        match self {
            Source::Extended(emitter) => emitter.listener_count(kind),
            Source::Plain(emitter) => emitter.listener_count(kind),
        }
    }
}

impl From<ExtendedEmitter> for Source {
    fn from(value: ExtendedEmitter) -> Self {
        Source::Extended(value)
    }
}

impl From<&ExtendedEmitter> for Source {
    fn from(value: &ExtendedEmitter) -> Self {
        Source::Extended(value.clone())
    }
}

impl From<Emitter> for Source {
    fn from(value: Emitter) -> Self {
        Source::Plain(value)
    }
}

impl From<&Emitter> for Source {
    fn from(value: &Emitter) -> Self {
        Source::Plain(value.clone())
    }
}

/// Forwarding stage installed on a plain emitter's entry point.
struct Piped {
    previous: Arc<dyn Dispatch>,
    target: ExtendedEmitter,
    except: HashSet<String>,
}

impl Dispatch for Piped {
    fn dispatch(&self, table: &Table, kind: &str, args: &[Value]) -> bool {
        let ran = self.previous.dispatch(table, kind, args);
        if kind != ERROR && !self.except.contains(kind) {
            tracing::trace!(kind, "forward");
            return self.target.emit(kind, args) || ran;
        }
        ran
    }
}

impl ExtendedEmitter {
    /// Re-emits on `self` every event of `source` whose kind is not in `except`.
    pub fn pipe_except<K, S>(&self, except: K, source: S) -> &Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        S: Into<Source>,
    {
        let except = kinds(except);
        tracing::debug!(?except, "pipe wired");

        match source.into() {
            Source::Extended(source) => {
                let target = self.clone();
                source.on_all_except(except, move |kind, args| {
                    tracing::trace!(kind, "forward");
                    target.emit(kind, args);
                });
            }
            Source::Plain(source) => {
                if !except.contains(ERROR) {
                    let target = self.clone();
                    source.on(ERROR, move |args| {
                        target.emit(ERROR, args);
                    });
                }
                let target = self.clone();
                source.decorate(move |previous| {
                    Arc::new(Piped {
                        previous,
                        target,
                        except,
                    })
                });
            }
        }
        self
    }

    /// Forwards the side events of `source` and bridges its terminal event.
    pub fn pipe_as_promise(&self, source: impl Into<Source>) -> Promise {
        let source = source.into();
        self.pipe_except([END, ERROR], source.clone());
        bridge::as_promise(source)
    }
}
