use crate::Error;
use crate::config::Config;
use crate::emitter::Emitter;
use crate::listener::{AllCallback, AllExcept, ListenerId, kinds};
use crate::schedule::Deferred;
use crate::value::{END, ERROR};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

struct Inner {
    base: Emitter,
    on_all: RwLock<Vec<AllExcept>>,
    deferred: Deferred,
}

/// Emitter with "listen on all kinds except" registrations and the terminal
/// `"end"`/`"error"` convention.
///
/// Cloning gives another handle to the same instance.
#[derive(Clone)]
pub struct ExtendedEmitter {
    inner: Arc<Inner>,
}

impl ExtendedEmitter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                base: Emitter::with_config(config),
                on_all: RwLock::new(Vec::new()),
                deferred: Deferred::default(),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        self.inner.base.config()
    }

    pub fn on<F>(&self, kind: impl Into<String>, f: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.inner.base.on(kind, f)
    }

    pub fn once<F>(&self, kind: impl Into<String>, f: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.inner.base.once(kind, f)
    }

    pub fn many<F>(&self, kind: impl Into<String>, times: usize, f: F) -> Result<ListenerId, Error>
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.inner.base.many(kind, times, f)
    }

    pub fn off(&self, kind: &str, id: ListenerId) -> bool {
        self.inner.base.off(kind, id)
    }

    /// Registers `f` for every kind not listed in `except`.
    ///
    /// There is no way to remove such a registration.
    pub fn on_all_except<K, F>(&self, except: K, f: F) -> &Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        F: Fn(&str, &[Value]) + Send + Sync + 'static,
    {
        let reg = AllExcept::new(kinds(except), Arc::new(f));
        self.inner.on_all.write().push(reg);
        self
    }

    /// Synchronously delivers `kind` to its listeners, then to the except-all
    /// listeners that accept it, in registration order.
    ///
    /// An `"error"` skips the per-kind listeners when only except-all listeners
    /// would see it and no `"error"` listener is registered; if no except-all
    /// listener accepts it either, the per-kind dispatch raises the unhandled-error
    /// fault.
    ///
    /// # Panics
    /// Panics with [`Error::UnhandledError`] for an `"error"` nobody observes.
    pub fn emit(&self, kind: &str, args: &[Value]) -> bool {
        let filtered = self.listeners_on_all(kind);

        let mut ran = false;
        if kind != ERROR || filtered.is_empty() || self.inner.base.listener_count(ERROR) > 0 {
            ran = self.inner.base.emit(kind, args);
        }

        for listener in &filtered {
            listener(kind, args);
        }

        ran || !filtered.is_empty()
    }

    /// Emits on a later turn, after everything previously scheduled on this
    /// instance.
    ///
    /// # Panics
    /// Panics with [`Error::UnsupportedRuntime`] outside a current-thread Tokio
    /// runtime.
    pub fn emit_async(&self, kind: impl Into<String>, args: Vec<Value>) -> &Self {
        let kind = kind.into();
        let this = self.clone();
        self.inner.deferred.schedule(move || {
            this.emit(&kind, &args);
        });
        self
    }

    /// Emits `"end"` with `args` on a later turn.
    pub fn start_pipeline(&self, args: Vec<Value>) -> &Self {
        self.emit_async(END, args)
    }

    /// Except-all listeners that would receive `kind`, in registration order.
    pub fn listeners_on_all(&self, kind: &str) -> Vec<AllCallback> {
        self.inner
            .on_all
            .read()
            .iter()
            .filter(|reg| reg.accepts(kind))
            .map(AllExcept::callback)
            .collect()
    }

    pub fn listener_count_on_all(&self, kind: &str) -> usize {
        self.inner
            .on_all
            .read()
            .iter()
            .filter(|reg| reg.accepts(kind))
            .count()
    }

    /// Applicable except-all listeners plus per-kind listeners.
    pub fn listener_count(&self, kind: &str) -> usize {
        self.listener_count_on_all(kind) + self.inner.base.listener_count(kind)
    }

    pub(crate) fn schedule(&self, job: impl FnOnce() + Send + 'static) {
        self.inner.deferred.schedule(job)
    }
}

impl Default for ExtendedEmitter {
    fn default() -> Self {
        Self::new()
    }
}
