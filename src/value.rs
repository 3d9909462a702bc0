use crate::ExtendedEmitter;

pub use serde_json::Value;

/// Terminal success kind.
pub const END: &str = "end";

/// Terminal failure kind.
pub const ERROR: &str = "error";

/// Terminal outcome of an emitter: at most one is ever produced per instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    End(Vec<Value>),
    Error { reason: Value, extra: Vec<Value> },
}

impl Outcome {
    /// Builds a failure from raw `"error"` arguments: the first one is the reason.
    pub fn error_from_args(args: &[Value]) -> Self {
        let (reason, extra) = match args.split_first() {
            Some((reason, extra)) => (reason.clone(), extra.to_vec()),
            None => (Value::Null, Vec::new()),
        };
        Outcome::Error { reason, extra }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::End(_) => END,
            Outcome::Error { .. } => ERROR,
        }
    }

    /// Positional arguments for the terminal event.
    pub fn into_args(self) -> Vec<Value> {
        match self {
            Outcome::End(values) => values,
            Outcome::Error { reason, extra } => {
                let mut args = Vec::with_capacity(extra.len() + 1);
                args.push(reason);
                args.extend(extra);
                args
            }
        }
    }

    /// Emits this outcome as the terminal event of `target`.
    pub fn emit_on(self, target: &ExtendedEmitter) -> bool {
        let kind = self.kind();
        target.emit(kind, &self.into_args())
    }
}

/// An array spreads into its elements, anything else is a single value.
pub(crate) fn spread(value: Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values,
        other => vec![other],
    }
}

/// Strict failure check: only an absent or `null` reason means success.
pub(crate) fn is_failure(reason: &Option<Value>) -> bool {
    matches!(reason, Some(value) if !value.is_null())
}

pub(crate) fn first_or_null(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Null)
}
