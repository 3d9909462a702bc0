//! Error types raised by emitters, forwarders and combinators.
//!
//! - [`Error::InvalidArgument`] is returned before any wiring happens.
//! - [`Error::ProtocolViolation`] and [`Error::UnhandledError`] are fatal and raised
//!   as panics carrying the error's message.
//! - [`Error::UnsupportedRuntime`] is raised as a panic by deferred emission off a
//!   current-thread Tokio runtime.
//! - [`Error::OperationFailure`] is the ordinary `"error"` outcome as seen through the
//!   future bridge.

use serde_json::Value;
use thiserror::Error;

/// Misuse of the terminal-event protocol by producer code.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A `map_async` completion was invoked twice.
    #[error("callback called more than once by function at position {0} (0-based)")]
    CallbackRepeated(usize),

    /// A `flat_map` inner emitter produced a second terminal event.
    #[error("end/error (or both) event emitted more than once by emitter at position {0} (0-based)")]
    TerminalRepeated(usize),
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A combinator or registration received an argument it cannot work with.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("protocol violation: {0}")]
    ProtocolViolation(Violation),

    /// An `"error"` event had nobody to observe it.
    #[error("unhandled error event: {reason}")]
    UnhandledError { reason: Value },

    /// The operation reported failure through its `"error"` event.
    #[error("operation failed: {reason}")]
    OperationFailure { reason: Value, extra: Vec<Value> },

    /// Every handle to the emitter was dropped before a terminal event.
    #[error("emitter dropped before a terminal event")]
    Abandoned,

    /// Deferred work was requested outside a current-thread Tokio runtime.
    #[error("deferred work needs a current-thread Tokio runtime")]
    UnsupportedRuntime,
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use evno_ex::{Error, Violation};
    ///
    /// let err = Error::ProtocolViolation(Violation::CallbackRepeated(0));
    /// assert_eq!(err.as_label(), "protocol_violation");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::InvalidArgument { .. } => "invalid_argument",
            Error::ProtocolViolation(_) => "protocol_violation",
            Error::UnhandledError { .. } => "unhandled_error",
            Error::OperationFailure { .. } => "operation_failure",
            Error::Abandoned => "abandoned",
            Error::UnsupportedRuntime => "unsupported_runtime",
        }
    }

    /// True for failures reported by the operation itself, as opposed to misuse.
    pub fn is_operation_failure(&self) -> bool {
        matches!(self, Error::OperationFailure { .. })
    }
}

impl From<Error> for Value {
    /// Operation failures give back their reason; anything else becomes its message.
    fn from(err: Error) -> Self {
        match err {
            Error::OperationFailure { reason, .. } => reason,
            other => Value::String(other.to_string()),
        }
    }
}
