//! User callbacks and operator options.
//!
//! Every callback receives the [`Dsl`] explicitly as its first argument and
//! the zero-based source index as its last one. The index is `None` when the
//! operator has a single source.

use std::sync::Arc;

use contracts::{MergeError, SourceError};

use crate::dsl::Dsl;

/// "Next value" callback
pub type NextHandler<T> =
    Arc<dyn Fn(&Dsl<T>, T, Option<usize>) -> Result<(), MergeError> + Send + Sync>;

/// Completion callback
pub type CompleteHandler<T> =
    Arc<dyn Fn(&Dsl<T>, Option<usize>) -> Result<(), MergeError> + Send + Sync>;

/// Error callback
pub type ErrorHandler<T> =
    Arc<dyn Fn(&Dsl<T>, SourceError, Option<usize>) -> Result<(), MergeError> + Send + Sync>;

/// A configured handler option
///
/// `NotCallable` carries a description of a configured value that cannot be
/// invoked, such as a number found in a config file.
#[derive(Clone)]
pub enum HandlerOption<F> {
    Callable(F),
    NotCallable(String),
}

impl<F> HandlerOption<F> {
    pub fn not_callable(description: impl Into<String>) -> Self {
        Self::NotCallable(description.into())
    }

    fn resolve(self, option: &str, operator: &str) -> Result<F, MergeError> {
        match self {
            Self::Callable(handler) => Ok(handler),
            Self::NotCallable(description) => Err(MergeError::configuration(
                option,
                operator,
                format!("expected a callable, got {description}"),
            )),
        }
    }
}

impl<F> std::fmt::Debug for HandlerOption<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Callable"),
            Self::NotCallable(description) => write!(f, "NotCallable({description})"),
        }
    }
}

/// Operator configuration record
pub struct MergeOptions<T> {
    /// Value-kind targets; defaults to true only for one value-kind source
    pub singleton: Option<bool>,
    /// Named outputs; `Some` selects multi-output mode
    pub emits: Option<Vec<String>>,
    pub on_next: Option<HandlerOption<NextHandler<T>>>,
    pub on_complete: Option<HandlerOption<CompleteHandler<T>>>,
    pub on_error: Option<HandlerOption<ErrorHandler<T>>>,
}

impl<T> Default for MergeOptions<T> {
    fn default() -> Self {
        Self {
            singleton: None,
            emits: None,
            on_next: None,
            on_complete: None,
            on_error: None,
        }
    }
}

impl<T> MergeOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = Some(singleton);
        self
    }

    pub fn emits<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emits = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn on_next(
        mut self,
        handler: impl Fn(&Dsl<T>, T, Option<usize>) -> Result<(), MergeError> + Send + Sync + 'static,
    ) -> Self {
        self.on_next = Some(HandlerOption::Callable(Arc::new(handler)));
        self
    }

    pub fn on_complete(
        mut self,
        handler: impl Fn(&Dsl<T>, Option<usize>) -> Result<(), MergeError> + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(HandlerOption::Callable(Arc::new(handler)));
        self
    }

    pub fn on_error(
        mut self,
        handler: impl Fn(&Dsl<T>, SourceError, Option<usize>) -> Result<(), MergeError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.on_error = Some(HandlerOption::Callable(Arc::new(handler)));
        self
    }

    /// Whether `emits` was supplied
    pub fn emits_supplied(&self) -> bool {
        self.emits.is_some()
    }
}

/// Resolved handlers, captured once at construction
pub struct HandlerSet<T> {
    pub on_next: NextHandler<T>,
    pub on_complete: CompleteHandler<T>,
    /// Kept optional: without it source errors go to the engine
    pub on_error: Option<ErrorHandler<T>>,
}

impl<T: 'static> HandlerSet<T> {
    /// Resolve configured options, defaulting `on_next`/`on_complete` to no-ops
    ///
    /// # Errors
    /// `Configuration` naming the first option that is not callable.
    pub fn resolve(
        on_next: Option<HandlerOption<NextHandler<T>>>,
        on_complete: Option<HandlerOption<CompleteHandler<T>>>,
        on_error: Option<HandlerOption<ErrorHandler<T>>>,
        operator: &str,
    ) -> Result<Self, MergeError> {
        let on_next = match on_next {
            Some(option) => option.resolve("on_next", operator)?,
            None => Arc::new(|_: &Dsl<T>, _: T, _: Option<usize>| Ok::<(), MergeError>(()))
                as NextHandler<T>,
        };
        let on_complete = match on_complete {
            Some(option) => option.resolve("on_complete", operator)?,
            None => Arc::new(|_: &Dsl<T>, _: Option<usize>| Ok::<(), MergeError>(()))
                as CompleteHandler<T>,
        };
        let on_error = on_error
            .map(|option| option.resolve("on_error", operator))
            .transpose()?;

        Ok(Self {
            on_next,
            on_complete,
            on_error,
        })
    }
}

impl<T> Clone for HandlerSet<T> {
    fn clone(&self) -> Self {
        Self {
            on_next: Arc::clone(&self.on_next),
            on_complete: Arc::clone(&self.on_complete),
            on_error: self.on_error.clone(),
        }
    }
}
