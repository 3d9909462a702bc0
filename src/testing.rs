use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Records every invocation of the listeners it hands out.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    calls: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
}

impl Recorder {
    pub(crate) fn listener(&self) -> impl Fn(&[Value]) + Clone + Send + Sync + 'static {
        let calls = Arc::clone(&self.calls);
        move |args: &[Value]| calls.lock().push((String::new(), args.to_vec()))
    }

    pub(crate) fn all_listener(&self) -> impl Fn(&str, &[Value]) + Clone + Send + Sync + 'static {
        let calls = Arc::clone(&self.calls);
        move |kind: &str, args: &[Value]| calls.lock().push((kind.to_owned(), args.to_vec()))
    }

    pub(crate) fn calls(&self) -> Vec<Vec<Value>> {
        self.calls.lock().iter().map(|(_, args)| args.clone()).collect()
    }

    pub(crate) fn kinds(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(kind, _)| kind.clone()).collect()
    }

    pub(crate) fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Forwards invocations into a channel so async tests can await them.
pub(crate) fn channel() -> (
    impl Fn(&[Value]) + Clone + Send + Sync + 'static,
    tokio::sync::mpsc::UnboundedReceiver<Vec<Value>>,
) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let listener = move |args: &[Value]| {
        let _ = tx.send(args.to_vec());
    };
    (listener, rx)
}
