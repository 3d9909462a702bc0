use crate::Error;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Handle returned by a registration, accepted by `off`.
pub type ListenerId = u64;

/// Listener for a single event kind; receives the positional arguments.
pub type Callback = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Listener for every kind outside an exclusion set; receives the kind too.
pub type AllCallback = Arc<dyn Fn(&str, &[Value]) + Send + Sync>;

struct Counter {
    remaining: AtomicUsize,
}

impl Counter {
    fn new(times: usize) -> Result<Self, Error> {
        if times == 0 {
            return Err(Error::invalid(format!(
                "limit must be greater than zero, got {times}"
            )));
        }
        Ok(Self {
            remaining: AtomicUsize::new(times),
        })
    }

    fn try_claim(&self) -> Claim {
        match self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(1) => Claim::Last,
            Ok(_) => Claim::Run,
            Err(_) => Claim::Spent,
        }
    }
}

pub(crate) enum Claim {
    Run,
    /// Run, then drop the registration.
    Last,
    Spent,
}

#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) id: ListenerId,
    callback: Callback,
    limit: Option<Arc<Counter>>,
}

impl Registration {
    pub(crate) fn unbounded(id: ListenerId, callback: Callback) -> Self {
        Self {
            id,
            callback,
            limit: None,
        }
    }

    pub(crate) fn bounded(id: ListenerId, times: usize, callback: Callback) -> Result<Self, Error> {
        Ok(Self {
            id,
            callback,
            limit: Some(Arc::new(Counter::new(times)?)),
        })
    }

    pub(crate) fn claim(&self) -> Claim {
        match &self.limit {
            Some(counter) => counter.try_claim(),
            None => Claim::Run,
        }
    }

    #[inline]
    pub(crate) fn call(&self, args: &[Value]) {
        (self.callback)(args)
    }
}

/// An "on all kinds except" registration. Immutable once created.
pub(crate) struct AllExcept {
    callback: AllCallback,
    except: HashSet<String>,
}

impl AllExcept {
    pub(crate) fn new(except: HashSet<String>, callback: AllCallback) -> Self {
        Self { callback, except }
    }

    #[inline]
    pub(crate) fn accepts(&self, kind: &str) -> bool {
        !self.except.contains(kind)
    }

    pub(crate) fn callback(&self) -> AllCallback {
        Arc::clone(&self.callback)
    }
}

pub(crate) fn kinds<K>(except: K) -> HashSet<String>
where
    K: IntoIterator,
    K::Item: Into<String>,
{
    except.into_iter().map(Into::into).collect()
}
