//! Merge operator: subscribes to every source, drives user callbacks and
//! exposes the resulting outputs.

use std::collections::HashSet;
use std::sync::Arc;

use contracts::{
    is_value_sequence, operator_name, MergeError, SequenceFactory, SourceSequence, Subscriber,
    DEFAULT_EMIT,
};
use tracing::{debug, info, instrument};

use crate::dsl::{Dsl, EmitMode};
use crate::guard::SynchronizationGuard;
use crate::handlers::{HandlerSet, MergeOptions};

/// Multi-source event merge operator
///
/// With one source, completion always ends in an implicit `done()`. With
/// several sources every callback runs under a shared guard, receives the
/// source index, and closing the outputs is left to user code.
pub struct MergeOperator<T, F: SequenceFactory<T>> {
    name: &'static str,
    sources: Vec<Arc<dyn SourceSequence<T>>>,
    singleton: bool,
    dsl: Arc<Dsl<T>>,
    outputs: Vec<(String, F::Target)>,
    handlers: HandlerSet<T>,
    guard: Arc<SynchronizationGuard>,
}

impl<T, F> MergeOperator<T, F>
where
    T: Send + 'static,
    F: SequenceFactory<T>,
{
    /// Validate options and create every target
    ///
    /// # Errors
    /// `Configuration` for an empty source list, a bad `emits` list or a
    /// handler option that is not callable.
    #[instrument(
        name = "merge_operator_new",
        skip_all,
        fields(sources = sources.len(), emits = ?options.emits)
    )]
    pub fn new(
        sources: Vec<Arc<dyn SourceSequence<T>>>,
        options: MergeOptions<T>,
        factory: &F,
    ) -> Result<Self, MergeError> {
        let name = operator_name(options.emits_supplied());

        if sources.is_empty() {
            return Err(MergeError::configuration(
                "sources",
                name,
                "at least one source is required",
            ));
        }
        if let Some(emits) = &options.emits {
            validate_emits(emits, name)?;
        }

        let MergeOptions {
            singleton,
            emits,
            on_next,
            on_complete,
            on_error,
        } = options;
        let handlers = HandlerSet::resolve(on_next, on_complete, on_error, name)?;

        let singleton =
            singleton.unwrap_or_else(|| sources.len() == 1 && is_value_sequence(sources[0].as_ref()));
        let (dsl, outputs) = Dsl::new(emits.as_deref(), singleton, factory);

        info!(
            operator = name,
            singleton,
            sources = sources.len(),
            targets = outputs.len(),
            "merge operator created"
        );

        Ok(Self {
            name,
            sources,
            singleton,
            dsl: Arc::new(dsl),
            outputs,
            handlers,
            guard: Arc::new(SynchronizationGuard::new()),
        })
    }

    /// Subscribe the wrapped handlers to every source
    ///
    /// Each call creates fresh subscriptions that share the same targets.
    ///
    /// # Errors
    /// `Subscribe` naming the first source that refused the subscription.
    /// Sources before it stay subscribed; there is no unsubscribe at this
    /// boundary.
    #[instrument(name = "merge_operator_apply", skip(self), fields(operator = self.name))]
    pub fn apply(&self) -> Result<(), MergeError> {
        for (index, source) in self.sources.iter().enumerate() {
            let subscriber = self.subscriber_for(index);
            source
                .subscribe(subscriber)
                .map_err(|source| MergeError::Subscribe { index, source })?;
            debug!(index, kind = ?source.kind(), "source subscribed");
        }
        Ok(())
    }

    fn subscriber_for(&self, index: usize) -> Subscriber<T> {
        if self.sources.len() == 1 {
            self.single_source_subscriber()
        } else {
            self.multi_source_subscriber(index)
        }
    }

    /// No guard, no index; completion always closes the outputs
    fn single_source_subscriber(&self) -> Subscriber<T> {
        let HandlerSet {
            on_next,
            on_complete,
            on_error,
        } = self.handlers.clone();

        let next_dsl = Arc::clone(&self.dsl);
        let complete_dsl = Arc::clone(&self.dsl);

        let subscriber = Subscriber::new(
            move |value| on_next(&next_dsl, value, None),
            move || {
                let outcome = on_complete(&complete_dsl, None);
                complete_dsl.done()?;
                outcome
            },
        );

        match on_error {
            Some(on_error) => {
                let dsl = Arc::clone(&self.dsl);
                subscriber.with_error_handler(move |error| on_error(&dsl, error, None))
            }
            None => subscriber,
        }
    }

    /// Every callback body runs under the shared guard, tagged with `index`
    fn multi_source_subscriber(&self, index: usize) -> Subscriber<T> {
        let HandlerSet {
            on_next,
            on_complete,
            on_error,
        } = self.handlers.clone();

        let next_dsl = Arc::clone(&self.dsl);
        let next_guard = Arc::clone(&self.guard);
        let complete_dsl = Arc::clone(&self.dsl);
        let complete_guard = Arc::clone(&self.guard);

        let subscriber = Subscriber::new(
            move |value| next_guard.run(|| on_next(&next_dsl, value, Some(index))),
            move || complete_guard.run(|| on_complete(&complete_dsl, Some(index))),
        );

        match on_error {
            Some(on_error) => {
                let dsl = Arc::clone(&self.dsl);
                let guard = Arc::clone(&self.guard);
                subscriber
                    .with_error_handler(move |error| guard.run(|| on_error(&dsl, error, Some(index))))
            }
            None => subscriber,
        }
    }

    /// The single output
    ///
    /// # Errors
    /// `Usage` when the operator declares named outputs.
    pub fn output(&self) -> Result<&F::Target, MergeError> {
        match self.dsl.mode() {
            EmitMode::Single => Ok(&self.outputs[0].1),
            EmitMode::Multi => Err(MergeError::usage(format!(
                "{} declares named outputs, use outputs()",
                self.name
            ))),
        }
    }

    /// Name to target mapping, in declared order
    pub fn outputs(&self) -> &[(String, F::Target)] {
        &self.outputs
    }

    /// Target declared under `name`
    pub fn output_named(&self, name: &str) -> Option<&F::Target> {
        self.outputs
            .iter()
            .find(|(declared, _)| declared == name)
            .map(|(_, target)| target)
    }

    /// Public name: `merge` or `multi_merge`
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn mode(&self) -> EmitMode {
        self.dsl.mode()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Emission context shared with the callbacks
    pub fn dsl(&self) -> &Arc<Dsl<T>> {
        &self.dsl
    }
}

fn validate_emits(emits: &[String], operator: &str) -> Result<(), MergeError> {
    if emits.is_empty() {
        return Err(MergeError::configuration(
            "emits",
            operator,
            "at least one emit name is required",
        ));
    }

    let mut seen = HashSet::new();
    for name in emits {
        if name.is_empty() {
            return Err(MergeError::configuration(
                "emits",
                operator,
                "emit names must not be empty",
            ));
        }
        if name == DEFAULT_EMIT {
            return Err(MergeError::configuration(
                "emits",
                operator,
                format!("'{DEFAULT_EMIT}' is reserved for the implicit output"),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(MergeError::configuration(
                "emits",
                operator,
                format!("duplicate emit name '{name}'"),
            ));
        }
    }
    Ok(())
}
