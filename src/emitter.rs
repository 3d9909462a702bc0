//! Plain synchronous emitter: the base publish/subscribe primitive.
//!
//! Listeners are kept per kind in a `papaya` map holding copy-on-write vectors, so an
//! emission works on a snapshot:
//!   - a listener added during emission is not called until the next emit;
//!   - a listener removed during emission is still called in that round.
//!
//! Emission goes through a chain of [`Dispatch`] stages. The innermost stage calls the
//! listeners; outer stages are installed by forwarders and run after it.

use crate::Error;
use crate::config::Config;
use crate::listener::{Callback, Claim, ListenerId, Registration};
use crate::value::{ERROR, first_or_null};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub(crate) struct Table {
    by_kind: papaya::HashMap<String, Vec<Registration>>,
    next_id: AtomicU64,
}

impl Table {
    /// Adds a registration and returns its id with the new listener count for `kind`.
    fn insert(
        &self,
        kind: String,
        make: impl FnOnce(ListenerId) -> Result<Registration, Error>,
    ) -> Result<(ListenerId, usize), Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let reg = make(id)?;
        let len = self
            .by_kind
            .pin()
            .update_or_insert_with(
                kind,
                |list| {
                    let mut list = list.clone();
                    list.push(reg.clone());
                    list
                },
                || vec![reg.clone()],
            )
            .len();
        Ok((id, len))
    }

    fn remove(&self, kind: &str, id: ListenerId) -> bool {
        let before = self.count(kind);
        self.by_kind.pin().update(kind.to_owned(), |list| {
            list.iter().filter(|reg| reg.id != id).cloned().collect()
        });
        self.count(kind) < before
    }

    pub(crate) fn count(&self, kind: &str) -> usize {
        self.by_kind.pin().get(kind).map_or(0, Vec::len)
    }

    /// Calls every listener for `kind`; an `"error"` nobody receives is fatal.
    pub(crate) fn invoke(&self, kind: &str, args: &[Value]) -> bool {
        let snapshot = self.by_kind.pin().get(kind).cloned().unwrap_or_default();

        let mut ran = false;
        for reg in snapshot {
            match reg.claim() {
                Claim::Spent => continue,
                Claim::Last => {
                    self.remove(kind, reg.id);
                }
                Claim::Run => {}
            }
            reg.call(args);
            ran = true;
        }

        if !ran && kind == ERROR {
            panic!(
                "{}",
                Error::UnhandledError {
                    reason: first_or_null(args)
                }
            );
        }
        ran
    }
}

/// One stage of an emitter's emission entry point.
pub(crate) trait Dispatch: Send + Sync {
    fn dispatch(&self, table: &Table, kind: &str, args: &[Value]) -> bool;
}

struct Direct;

impl Dispatch for Direct {
    #[inline]
    fn dispatch(&self, table: &Table, kind: &str, args: &[Value]) -> bool {
        table.invoke(kind, args)
    }
}

struct Inner {
    table: Table,
    entry: RwLock<Arc<dyn Dispatch>>,
    config: Config,
}

/// Plain event emitter. Cloning gives another handle to the same instance.
#[derive(Clone)]
pub struct Emitter {
    inner: Arc<Inner>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: Table::default(),
                entry: RwLock::new(Arc::new(Direct)),
                config,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Registers `f` for every emission of `kind`.
    pub fn on<F>(&self, kind: impl Into<String>, f: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(f);
        let kind = kind.into();
        match self.register(kind, |id| Ok(Registration::unbounded(id, callback))) {
            Ok(id) => id,
            Err(_) => unreachable!("unbounded registration is infallible"),
        }
    }

    /// Registers `f` for the next emission of `kind` only.
    pub fn once<F>(&self, kind: impl Into<String>, f: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        match self.many(kind, 1, f) {
            Ok(id) => id,
            Err(_) => unreachable!("a single invocation is a valid limit"),
        }
    }

    /// Registers `f` for the next `times` emissions of `kind`.
    ///
    /// Fails with [`Error::InvalidArgument`] when `times` is zero.
    pub fn many<F>(&self, kind: impl Into<String>, times: usize, f: F) -> Result<ListenerId, Error>
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(f);
        self.register(kind.into(), |id| Registration::bounded(id, times, callback))
    }

    /// Removes a registration. Returns false if it was not present.
    pub fn off(&self, kind: &str, id: ListenerId) -> bool {
        self.inner.table.remove(kind, id)
    }

    /// Synchronously calls the listeners of `kind`, then any installed forwarders.
    ///
    /// Returns true if at least one listener ran.
    ///
    /// # Panics
    /// Panics with [`Error::UnhandledError`] if `kind` is `"error"` and nothing
    /// observes it.
    pub fn emit(&self, kind: &str, args: &[Value]) -> bool {
        let entry = Arc::clone(&self.inner.entry.read());
        tracing::trace!(kind, args = args.len(), "emit");
        entry.dispatch(&self.inner.table, kind, args)
    }

    pub fn listener_count(&self, kind: &str) -> usize {
        self.inner.table.count(kind)
    }

    /// Wraps the current emission entry point; earlier stages keep running first.
    pub(crate) fn decorate(&self, wrap: impl FnOnce(Arc<dyn Dispatch>) -> Arc<dyn Dispatch>) {
        let mut entry = self.inner.entry.write();
        let previous = Arc::clone(&entry);
        *entry = wrap(previous);
    }

    fn register(
        &self,
        kind: String,
        make: impl FnOnce(ListenerId) -> Result<Registration, Error>,
    ) -> Result<ListenerId, Error> {
        let (id, len) = self.inner.table.insert(kind.clone(), make)?;
        if let Some(limit) = self.inner.config.listener_limit() {
            if len == limit + 1 {
                tracing::warn!(
                    kind = %kind,
                    listeners = len,
                    limit,
                    "possible listener leak: limit exceeded"
                );
            }
        }
        Ok(id)
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}
