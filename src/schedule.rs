//! Deferred execution with per-instance FIFO ordering.
//!
//! ```text
//! schedule(job) ──► [unbounded queue] ──► worker task ──► job()
//! ```
//!
//! The worker is spawned on the current Tokio runtime by the first `schedule` call.
//! Only a current-thread runtime is accepted: its tasks start once the caller yields,
//! so jobs always run on a later turn than the call that queued them. The worker
//! exits once the owning emitter and every queued job are gone.

use crate::Error;
use std::sync::OnceLock;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
pub(crate) struct Deferred {
    tx: OnceLock<mpsc::UnboundedSender<Job>>,
}

impl Deferred {
    /// Queues `job` behind every job previously queued on this instance.
    ///
    /// # Panics
    /// Panics with [`Error::UnsupportedRuntime`] outside a current-thread Tokio
    /// runtime.
    pub(crate) fn schedule(&self, job: impl FnOnce() + Send + 'static) {
        ensure_cooperative();
        let tx = self.tx.get_or_init(|| {
            let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
            tokio::spawn(async move {
                while let Some(job) = rx.recv().await {
                    job();
                }
            });
            tx
        });

        if tx.send(Box::new(job)).is_err() {
            tracing::warn!("deferred worker stopped; job dropped");
        }
    }
}

/// Spawns `future` to run once the caller yields.
///
/// # Panics
/// Panics with [`Error::UnsupportedRuntime`] outside a current-thread Tokio runtime.
pub(crate) fn spawn<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    ensure_cooperative();
    tokio::spawn(future);
}

fn ensure_cooperative() {
    let flavor = Handle::try_current().map(|handle| handle.runtime_flavor());
    if !matches!(flavor, Ok(RuntimeFlavor::CurrentThread)) {
        panic!("{}", Error::UnsupportedRuntime);
    }
}
