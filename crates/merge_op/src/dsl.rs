//! Emission surface handed to user callbacks.
//!
//! The dsl owns one target per declared emit name plus the emission state:
//! a per-target `emitted` flag and an operator-wide `stopped` flag. Both flags
//! only ever go from `false` to `true`.
//!
//! Two variants are selected at construction:
//! - [`SingleOutput`]: no `emits` supplied, one implicit target, `emit(value)`
//! - [`MultiOutput`]: `emits` supplied, named targets, `emit(name, value)`
//!
//! [`Dsl`] wraps both and offers the mode-agnostic surface callbacks use;
//! calling the form that does not match the mode is a usage error.

use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{
    MergeError, SequenceFactory, SequenceKind, TargetSequence, DEFAULT_EMIT,
};
use tracing::{debug, instrument, trace, warn};

/// Output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// One implicit target
    Single,
    /// Named targets
    Multi,
}

struct TargetSlot<T> {
    name: String,
    target: Box<dyn TargetSequence<T>>,
    emitted: AtomicBool,
}

/// Ordered targets plus emission state, shared by both variants
struct TargetTable<T> {
    slots: Vec<TargetSlot<T>>,
    stopped: AtomicBool,
}

impl<T> TargetTable<T> {
    fn build<F>(names: &[String], kind: SequenceKind, factory: &F) -> (Self, Vec<(String, F::Target)>)
    where
        F: SequenceFactory<T>,
        T: 'static,
    {
        let mut slots = Vec::with_capacity(names.len());
        let mut handles = Vec::with_capacity(names.len());
        for name in names {
            let target = factory.create(kind);
            handles.push((name.clone(), target.clone()));
            slots.push(TargetSlot {
                name: name.clone(),
                target: Box::new(target),
                emitted: AtomicBool::new(false),
            });
        }

        let table = Self {
            slots,
            stopped: AtomicBool::new(false),
        };
        (table, handles)
    }

    fn slot(&self, name: &str) -> Option<&TargetSlot<T>> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    fn bind(slot: &TargetSlot<T>, value: T) -> Result<(), MergeError> {
        slot.target
            .bind(value)
            .map_err(|e| MergeError::target(&slot.name, e))?;
        slot.emitted.store(true, Ordering::Release);
        trace!(target_name = %slot.name, "emitted");
        observability::record_emit(&slot.name);
        Ok(())
    }

    /// Close every stream target and every value target never written
    ///
    /// Once a pass has closed anything, later calls do nothing, even for
    /// targets that became eligible in between. A target that refuses to
    /// stop does not end the pass; the first such failure is returned after
    /// every other eligible target has been closed.
    fn done(&self) -> Result<usize, MergeError> {
        if self.stopped.load(Ordering::Acquire) {
            debug!("done() ignored, outputs already stopped");
            observability::record_done(0);
            return Ok(0);
        }

        let mut closed = 0;
        let mut first_error = None;
        for slot in &self.slots {
            let open_value = !slot.emitted.load(Ordering::Acquire);
            if slot.target.kind().is_value() && !open_value {
                continue;
            }
            match slot.target.stop() {
                Ok(()) => {
                    self.stopped.store(true, Ordering::Release);
                    closed += 1;
                    debug!(target_name = %slot.name, "target closed");
                }
                Err(e) => {
                    warn!(target_name = %slot.name, error = %e, "target refused to stop");
                    first_error.get_or_insert(MergeError::target(&slot.name, e));
                }
            }
        }

        observability::record_done(closed);
        match first_error {
            Some(error) => Err(error),
            None => Ok(closed),
        }
    }
}

/// Single-output variant
pub struct SingleOutput<T> {
    table: TargetTable<T>,
}

impl<T> SingleOutput<T> {
    /// Append to (or resolve) the implicit target
    pub fn emit(&self, value: T) -> Result<(), MergeError> {
        TargetTable::bind(&self.table.slots[0], value)
    }

    /// Close the implicit target unless it is a resolved value
    pub fn done(&self) -> Result<(), MergeError> {
        self.table.done().map(|_| ())
    }
}

/// Multi-output variant
pub struct MultiOutput<T> {
    table: TargetTable<T>,
}

impl<T> MultiOutput<T> {
    /// Append to (or resolve) the named target
    ///
    /// # Errors
    /// `Usage` if `name` was not declared in `emits`.
    pub fn emit(&self, name: &str, value: T) -> Result<(), MergeError> {
        let slot = self.table.slot(name).ok_or_else(|| {
            let declared: Vec<&str> = self.table.slots.iter().map(|s| s.name.as_str()).collect();
            MergeError::usage(format!(
                "unknown emit name '{name}', declared names are {declared:?}"
            ))
        })?;
        TargetTable::bind(slot, value)
    }

    pub fn done(&self) -> Result<(), MergeError> {
        self.table.done().map(|_| ())
    }
}

/// Emission context passed to every user callback
pub enum Dsl<T> {
    Single(SingleOutput<T>),
    Multi(MultiOutput<T>),
}

impl<T: 'static> Dsl<T> {
    /// Create the dsl and its targets
    ///
    /// `emits: None` selects single-output mode with the implicit
    /// [`DEFAULT_EMIT`] target. Targets are value kind when `singleton` is
    /// set. Returns the engine-side target handles in declared order.
    #[instrument(name = "dsl_new", level = "debug", skip(emits, factory), fields(emits = ?emits))]
    pub fn new<F>(
        emits: Option<&[String]>,
        singleton: bool,
        factory: &F,
    ) -> (Self, Vec<(String, F::Target)>)
    where
        F: SequenceFactory<T>,
    {
        let kind = if singleton {
            SequenceKind::Value
        } else {
            SequenceKind::Stream
        };

        match emits {
            None => {
                let names = [DEFAULT_EMIT.to_string()];
                let (table, handles) = TargetTable::build(&names, kind, factory);
                (Self::Single(SingleOutput { table }), handles)
            }
            Some(names) => {
                let (table, handles) = TargetTable::build(names, kind, factory);
                (Self::Multi(MultiOutput { table }), handles)
            }
        }
    }
}

impl<T> Dsl<T> {
    pub fn mode(&self) -> EmitMode {
        match self {
            Self::Single(_) => EmitMode::Single,
            Self::Multi(_) => EmitMode::Multi,
        }
    }

    /// Single-output form
    ///
    /// # Errors
    /// `Usage` in multi-output mode.
    pub fn emit(&self, value: T) -> Result<(), MergeError> {
        match self {
            Self::Single(single) => single.emit(value),
            Self::Multi(_) => Err(MergeError::usage(
                "operator declares named outputs, use emit_to(name, value)",
            )),
        }
    }

    /// Multi-output form
    ///
    /// # Errors
    /// `Usage` in single-output mode or for an undeclared name.
    pub fn emit_to(&self, name: &str, value: T) -> Result<(), MergeError> {
        match self {
            Self::Single(_) => Err(MergeError::usage(format!(
                "operator has a single output, use emit(value) instead of emit_to('{name}', value)"
            ))),
            Self::Multi(multi) => multi.emit(name, value),
        }
    }

    /// Close outputs; see [`SingleOutput::done`] and [`MultiOutput::done`]
    #[instrument(name = "dsl_done", level = "debug", skip(self))]
    pub fn done(&self) -> Result<(), MergeError> {
        match self {
            Self::Single(single) => single.done(),
            Self::Multi(multi) => multi.done(),
        }
    }

    pub fn as_multi(&self) -> Option<&MultiOutput<T>> {
        match self {
            Self::Single(_) => None,
            Self::Multi(multi) => Some(multi),
        }
    }

    /// Whether a `done()` pass has closed at least one target
    pub fn is_stopped(&self) -> bool {
        self.table().stopped.load(Ordering::Acquire)
    }

    /// Whether `name` has been emitted to; `false` for unknown names
    pub fn has_emitted(&self, name: &str) -> bool {
        self.table()
            .slot(name)
            .is_some_and(|slot| slot.emitted.load(Ordering::Acquire))
    }

    /// Declared target names, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table().slots.iter().map(|slot| slot.name.as_str())
    }

    /// Name to target mapping, in declared order
    pub fn targets(&self) -> impl Iterator<Item = (&str, &dyn TargetSequence<T>)> {
        self.table()
            .slots
            .iter()
            .map(|slot| (slot.name.as_str(), slot.target.as_ref()))
    }

    fn table(&self) -> &TargetTable<T> {
        match self {
            Self::Single(single) => &single.table,
            Self::Multi(multi) => &multi.table,
        }
    }
}

impl<T> std::fmt::Debug for Dsl<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dsl")
            .field("mode", &self.mode())
            .field("names", &self.names().collect::<Vec<_>>())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingFactory, RecordingTarget};
    use contracts::Signal;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn single(singleton: bool) -> (Dsl<i32>, RecordingTarget<i32>) {
        let (dsl, mut handles) = Dsl::new(None, singleton, &RecordingFactory);
        let (name, target) = handles.remove(0);
        assert_eq!(name, DEFAULT_EMIT);
        (dsl, target)
    }

    fn multi(list: &[&str], singleton: bool) -> (Dsl<i32>, Vec<(String, RecordingTarget<i32>)>) {
        let declared = names(list);
        Dsl::new(Some(&declared), singleton, &RecordingFactory)
    }

    #[test]
    fn test_single_mode_targets() {
        let (dsl, target) = single(false);
        assert_eq!(dsl.mode(), EmitMode::Single);
        assert_eq!(dsl.names().collect::<Vec<_>>(), vec![DEFAULT_EMIT]);
        assert_eq!(target.kind(), SequenceKind::Stream);
        assert!(!dsl.has_emitted(DEFAULT_EMIT));
    }

    #[test]
    fn test_single_emit_and_done() {
        let (dsl, target) = single(false);
        dsl.emit(1).unwrap();
        dsl.emit(2).unwrap();
        dsl.done().unwrap();

        assert!(dsl.has_emitted(DEFAULT_EMIT));
        assert!(dsl.is_stopped());
        assert_eq!(
            target.signals(),
            vec![Signal::Item(1), Signal::Item(2), Signal::Stop]
        );
    }

    #[test]
    fn test_emit_to_in_single_mode_is_usage_error() {
        let (dsl, target) = single(false);
        let err = dsl.emit_to(DEFAULT_EMIT, 1).unwrap_err();
        assert!(err.is_usage());
        assert!(target.signals().is_empty());
    }

    #[test]
    fn test_multi_emit_rules() {
        let (dsl, handles) = multi(&["a", "b"], false);
        assert_eq!(dsl.mode(), EmitMode::Multi);

        assert!(dsl.emit(1).unwrap_err().is_usage());
        dsl.emit_to("a", 1).unwrap();
        assert!(dsl.emit_to("c", 1).unwrap_err().is_usage());

        assert_eq!(handles[0].1.signals(), vec![Signal::Item(1)]);
        assert!(handles[1].1.signals().is_empty());
        assert!(dsl.has_emitted("a"));
        assert!(!dsl.has_emitted("b"));
        assert!(!dsl.has_emitted("c"));
    }

    #[test]
    fn test_single_name_emits_is_multi_mode() {
        let (dsl, _handles) = multi(&["only"], false);
        assert_eq!(dsl.mode(), EmitMode::Multi);
        assert!(dsl.emit(1).unwrap_err().is_usage());
        dsl.emit_to("only", 1).unwrap();
    }

    #[test]
    fn test_done_closes_every_stream_target_in_one_pass() {
        let (dsl, handles) = multi(&["a", "b", "c"], false);
        dsl.emit_to("b", 5).unwrap();
        dsl.done().unwrap();

        for (_, target) in &handles {
            assert_eq!(target.stop_count(), 1);
        }
    }

    #[test]
    fn test_second_done_is_noop() {
        let (dsl, target) = single(false);
        dsl.done().unwrap();
        dsl.done().unwrap();
        assert_eq!(target.stop_count(), 1);
    }

    #[test]
    fn test_resolved_value_target_never_stopped() {
        let (dsl, target) = single(true);
        assert_eq!(target.kind(), SequenceKind::Value);

        dsl.emit(9).unwrap();
        dsl.done().unwrap();

        assert_eq!(target.signals(), vec![Signal::Item(9)]);
        // nothing was closed, so the flag stays down
        assert!(!dsl.is_stopped());
    }

    #[test]
    fn test_unwritten_value_target_stopped() {
        let (dsl, target) = single(true);
        dsl.done().unwrap();
        assert_eq!(target.signals(), vec![Signal::Stop]);
        assert!(dsl.is_stopped());
    }

    #[test]
    fn test_second_done_after_partial_close_is_noop() {
        let (dsl, handles) = multi(&["a", "b"], true);
        dsl.emit_to("a", 1).unwrap();

        // closes "b" only, "a" is resolved
        dsl.done().unwrap();
        assert_eq!(handles[0].1.signals(), vec![Signal::Item(1)]);
        assert_eq!(handles[1].1.signals(), vec![Signal::Stop]);

        // nothing reopens; a later pass closes nothing
        dsl.done().unwrap();
        assert_eq!(handles[1].1.stop_count(), 1);
    }

    #[test]
    fn test_second_write_to_value_target_rejected_by_engine() {
        let (dsl, target) = single(true);
        dsl.emit(1).unwrap();
        let err = dsl.emit(2).unwrap_err();
        assert!(matches!(err, MergeError::Target { .. }));
        assert_eq!(target.signals(), vec![Signal::Item(1)]);
    }

    #[test]
    fn test_targets_mapping_in_declared_order() {
        let (dsl, _handles) = multi(&["z", "a"], false);
        let listed: Vec<(&str, SequenceKind)> =
            dsl.targets().map(|(name, t)| (name, t.kind())).collect();
        assert_eq!(
            listed,
            vec![("z", SequenceKind::Stream), ("a", SequenceKind::Stream)]
        );
    }

    #[test]
    fn test_done_keeps_closing_after_a_target_refuses_stop() {
        let (dsl, handles) = multi(&["a", "b", "c"], false);
        handles[1].1.refuse_stop();

        let err = dsl.done().unwrap_err();
        match err {
            MergeError::Target { target, .. } => assert_eq!(target, "b"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(handles[0].1.signals(), vec![Signal::Stop]);
        assert!(handles[1].1.signals().is_empty());
        assert_eq!(handles[2].1.signals(), vec![Signal::Stop]);
        assert!(dsl.is_stopped());

        dsl.done().unwrap();
        assert_eq!(handles[2].1.stop_count(), 1);
    }
}
