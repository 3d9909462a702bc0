use crate::value::Outcome;
use crossbeam_utils::CachePadded;
use serde_json::Value;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Result reported by one combinator position.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Done(Vec<Value>),
    /// Raw `"error"` arguments: reason first.
    Failed(Vec<Value>),
}

/// How a failure is reported once every position has settled.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Report {
    /// Reason and extra arguments.
    Full,
    ReasonOnly,
}

/// Write-once slot per position plus a countdown of unfilled slots.
pub(crate) struct Gather {
    slots: Box<[OnceLock<Slot>]>,
    remaining: CachePadded<AtomicUsize>,
}

impl Gather {
    pub(crate) fn new(positions: usize) -> Self {
        Self {
            slots: (0..positions).map(|_| OnceLock::new()).collect(),
            remaining: CachePadded::new(AtomicUsize::new(positions)),
        }
    }

    /// Stores the result of `position`.
    ///
    /// Returns `Ok(true)` for the last unfilled slot and `Err` if `position` was
    /// already filled.
    pub(crate) fn fill(&self, position: usize, slot: Slot) -> Result<bool, Slot> {
        self.slots[position].set(slot)?;
        Ok(self.remaining.fetch_sub(1, Ordering::AcqRel) == 1)
    }

    /// The first failure in position order wins; otherwise every position's values
    /// are concatenated in position order.
    pub(crate) fn outcome(&self, report: Report) -> Outcome {
        let mut values = Vec::new();
        for slot in self.slots.iter().filter_map(OnceLock::get) {
            match slot {
                Slot::Done(done) => values.extend(done.iter().cloned()),
                Slot::Failed(args) => {
                    let outcome = Outcome::error_from_args(args);
                    return match (report, outcome) {
                        (Report::ReasonOnly, Outcome::Error { reason, .. }) => Outcome::Error {
                            reason,
                            extra: Vec::new(),
                        },
                        (_, outcome) => outcome,
                    };
                }
            }
        }
        Outcome::End(values)
    }
}
