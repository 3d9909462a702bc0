use super::gather::{Gather, Report, Slot};
use super::{ensure_functions, settle, stage};
use crate::{Error, Violation};
use crate::extended::ExtendedEmitter;
use crate::pipe::Source;
use crate::value::{END, ERROR};
use serde_json::Value;
use std::sync::Arc;

/// A `flat_map` function: returns the inner emitter whose terminal event settles
/// its position.
pub type FlatFn = Arc<dyn Fn(&ExtendedEmitter, &[Value]) -> Source + Send + Sync>;

#[inline]
pub fn flat_fn<F, S>(f: F) -> FlatFn
where
    F: Fn(&ExtendedEmitter, &[Value]) -> S + Send + Sync + 'static,
    S: Into<Source>,
{
    Arc::new(move |out: &ExtendedEmitter, args: &[Value]| -> Source { f(out, args).into() })
}

impl ExtendedEmitter {
    /// Derives a stage fed by the emitters the functions return.
    ///
    /// Side events of every inner emitter are forwarded as they happen. Once every
    /// inner emitter has emitted its single `"end"` or `"error"`, the stage emits
    /// `"end"` with all end values concatenated by position, or `"error"` with the
    /// lowest-position failure. A single inner emitter's failure is passed through
    /// with its extra values; with several, only the reason is kept.
    ///
    /// # Panics
    /// An inner emitter producing a second terminal event panics with
    /// [`Error::ProtocolViolation`] inside that emitter's `emit`.
    ///
    /// Fails with [`Error::InvalidArgument`] when `funcs` is empty.
    pub fn flat_map(&self, funcs: Vec<FlatFn>) -> Result<ExtendedEmitter, Error> {
        ensure_functions("flat_map", funcs.len())?;

        let report = if funcs.len() == 1 {
            Report::Full
        } else {
            Report::ReasonOnly
        };

        let out = stage(self);
        let target = out.clone();
        self.on(END, move |args| {
            let gather = Arc::new(Gather::new(funcs.len()));
            for (position, f) in funcs.iter().enumerate() {
                let inner = f(&target, args);
                target.pipe_except([END, ERROR], inner.clone());

                let (out, slots) = (target.clone(), Arc::clone(&gather));
                inner.on(END, move |values| {
                    terminal(&out, &slots, position, Slot::Done(values.to_vec()), report)
                });
                let (out, slots) = (target.clone(), Arc::clone(&gather));
                inner.on(ERROR, move |values| {
                    terminal(&out, &slots, position, Slot::Failed(values.to_vec()), report)
                });
            }
        });
        Ok(out)
    }
}

fn terminal(out: &ExtendedEmitter, gather: &Gather, position: usize, slot: Slot, report: Report) {
    match gather.fill(position, slot) {
        Ok(true) => settle(out, gather.outcome(report), "flat_map"),
        Ok(false) => {}
        Err(_) => panic!(
            "{}",
            Error::ProtocolViolation(Violation::TerminalRepeated(position))
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Emitter;
    use crate::testing::{Recorder, channel};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Flat-maps `source` onto one inner emitter and hands it back.
    fn single(source: &ExtendedEmitter) -> (ExtendedEmitter, ExtendedEmitter) {
        let inner = ExtendedEmitter::new();
        let returned = inner.clone();
        let out = source.flat_map(vec![flat_fn(move |_, _| returned.clone())]).unwrap();
        out.on(END, |_| {});
        out.on(ERROR, |_| {});
        source.emit(END, &[]);
        (inner, out)
    }

    #[test]
    fn function_receives_the_output_stage() {
        let source = ExtendedEmitter::new();
        let out = source
            .flat_map(vec![flat_fn(|stage, _| {
                let inner = ExtendedEmitter::new();
                stage.emit("info", &[json!("from stage")]);
                inner
            })])
            .unwrap();
        let info = Recorder::default();
        out.on("info", info.listener());

        source.emit(END, &[]);
        assert_eq!(info.calls(), vec![vec![json!("from stage")]]);
    }

    #[test]
    #[should_panic(expected = "end/error (or both) event emitted more than once by emitter at position 0 (0-based)")]
    fn second_end_is_a_protocol_violation() {
        let (inner, _out) = single(&ExtendedEmitter::new());
        inner.emit(END, &[]);
        inner.emit(END, &[]);
    }

    #[test]
    #[should_panic(expected = "emitted more than once by emitter at position 0")]
    fn second_error_is_a_protocol_violation() {
        let (inner, _out) = single(&ExtendedEmitter::new());
        inner.emit(ERROR, &[json!("123")]);
        inner.emit(ERROR, &[json!("234")]);
    }

    #[test]
    #[should_panic(expected = "emitted more than once by emitter at position 0")]
    fn error_after_end_is_a_protocol_violation() {
        let (inner, _out) = single(&ExtendedEmitter::new());
        inner.emit(END, &[]);
        inner.emit(ERROR, &[json!("234")]);
    }

    #[test]
    #[should_panic(expected = "emitted more than once by emitter at position 0")]
    fn end_after_error_is_a_protocol_violation() {
        let (inner, _out) = single(&ExtendedEmitter::new());
        inner.emit(ERROR, &[json!("123")]);
        inner.emit(END, &[json!(1)]);
    }

    #[test]
    fn single_inner_terminal_passes_through() {
        let source = ExtendedEmitter::new();
        let inner = ExtendedEmitter::new();
        let returned = inner.clone();
        let out = source.flat_map(vec![flat_fn(move |_, _| returned.clone())]).unwrap();
        let err = Recorder::default();
        out.on(ERROR, err.listener());

        source.emit(END, &[]);
        inner.emit(ERROR, &[json!("boom"), json!("detail")]);
        assert_eq!(err.calls(), vec![vec![json!("boom"), json!("detail")]]);
    }

    #[test]
    fn ends_are_collected_by_position() {
        let source = ExtendedEmitter::new();
        let first = ExtendedEmitter::new();
        let second = Emitter::new();
        let (a, b) = (first.clone(), second.clone());
        let out = source
            .flat_map(vec![
                flat_fn(move |_, _| a.clone()),
                flat_fn(move |_, _| b.clone()),
            ])
            .unwrap();
        let end = Recorder::default();
        out.on(END, end.listener());

        source.emit(END, &[]);
        second.emit(END, &[json!("C")]);
        assert_eq!(end.count(), 0);
        first.emit(END, &[json!("A"), json!("B")]);

        assert_eq!(end.calls(), vec![vec![json!("A"), json!("B"), json!("C")]]);
    }

    #[test]
    fn error_waits_for_every_position() {
        let source = ExtendedEmitter::new();
        let first = ExtendedEmitter::new();
        let second = ExtendedEmitter::new();
        let (a, b) = (first.clone(), second.clone());
        let out = source
            .flat_map(vec![
                flat_fn(move |_, _| a.clone()),
                flat_fn(move |_, _| b.clone()),
            ])
            .unwrap();
        let err = Recorder::default();
        let end = Recorder::default();
        out.on(ERROR, err.listener());
        out.on(END, end.listener());

        source.emit(END, &[]);
        first.emit(ERROR, &[json!("position 0"), json!("dropped")]);
        assert_eq!(err.count(), 0);

        second.emit(END, &[json!(1)]);
        assert_eq!(err.calls(), vec![vec![json!("position 0")]]);
        assert_eq!(end.count(), 0);
    }

    #[test]
    fn inner_side_events_are_forwarded_as_they_happen() {
        for plain in [false, true] {
            let source = ExtendedEmitter::new();
            let inner: Source = if plain {
                Emitter::new().into()
            } else {
                ExtendedEmitter::new().into()
            };
            let returned = inner.clone();
            let out = source
                .flat_map(vec![flat_fn(move |_, _| returned.clone())])
                .unwrap();
            let rec = Recorder::default();
            out.on_all_except(Vec::<String>::new(), rec.all_listener());

            source.emit("msg", &[json!("M")]);
            source.emit(END, &[json!("A")]);
            inner.emit("info", &[json!("I")]);
            inner.emit(END, &[json!("B")]);

            assert_eq!(rec.kinds(), vec!["msg", "info", END]);
            assert_eq!(rec.calls().last().unwrap(), &vec![json!("B")]);
        }
    }

    #[tokio::test]
    async fn chains_across_stages() {
        let source = ExtendedEmitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let out = source
            .flat_map(vec![flat_fn(move |_, args| {
                log.lock().extend(args.iter().cloned());
                let inner = ExtendedEmitter::new();
                inner.emit_async("data", vec![json!("D")]);
                inner.start_pipeline(vec![json!(args.len())]);
                inner
            })])
            .unwrap()
            .map(vec![crate::map_fn(|_, a| {
                Ok(json!(a[0].as_i64().unwrap() * 10).into())
            })])
            .unwrap();
        let (data, mut data_rx) = channel();
        out.on("data", data);

        source.start_pipeline(vec![json!("x"), json!("y"), json!("z")]);
        assert_eq!(out.as_promise().await.unwrap(), json!(30));
        assert_eq!(data_rx.recv().await.unwrap(), vec![json!("D")]);
        assert_eq!(seen.lock().len(), 3);
    }
}
