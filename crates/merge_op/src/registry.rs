//! Named handlers for declarative operators.
//!
//! An [`OperatorDecl`] refers to handlers by name. Resolution never fails
//! here: a reference that cannot be turned into a callable becomes
//! [`HandlerOption::NotCallable`] and is rejected by [`MergeOperator::new`]
//! with the operator's public name.
//!
//! [`MergeOperator::new`]: crate::MergeOperator::new

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{MergeError, OperatorDecl, SourceError};
use serde_json::Value;

use crate::dsl::Dsl;
use crate::handlers::{CompleteHandler, ErrorHandler, HandlerOption, MergeOptions, NextHandler};

/// Registered handler, tagged by the event it handles
pub enum NamedHandler<T> {
    Next(NextHandler<T>),
    Complete(CompleteHandler<T>),
    Error(ErrorHandler<T>),
}

impl<T> NamedHandler<T> {
    fn event(&self) -> &'static str {
        match self {
            Self::Next(_) => "on_next",
            Self::Complete(_) => "on_complete",
            Self::Error(_) => "on_error",
        }
    }
}

impl<T> Clone for NamedHandler<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Next(h) => Self::Next(Arc::clone(h)),
            Self::Complete(h) => Self::Complete(Arc::clone(h)),
            Self::Error(h) => Self::Error(Arc::clone(h)),
        }
    }
}

/// Handler lookup table
pub struct HandlerRegistry<T> {
    handlers: HashMap<String, NamedHandler<T>>,
}

impl<T> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<T> HandlerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_next(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&Dsl<T>, T, Option<usize>) -> Result<(), MergeError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.handlers
            .insert(name.into(), NamedHandler::Next(Arc::new(handler)));
        self
    }

    pub fn register_complete(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&Dsl<T>, Option<usize>) -> Result<(), MergeError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.handlers
            .insert(name.into(), NamedHandler::Complete(Arc::new(handler)));
        self
    }

    pub fn register_error(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&Dsl<T>, SourceError, Option<usize>) -> Result<(), MergeError>
            + Send
            + Sync
            + 'static,
    ) -> &mut Self {
        self.handlers
            .insert(name.into(), NamedHandler::Error(Arc::new(handler)));
        self
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a `"next"` reference
    pub fn next_option(&self, reference: &Value) -> HandlerOption<NextHandler<T>> {
        match self.lookup(reference) {
            Ok(NamedHandler::Next(h)) => HandlerOption::Callable(Arc::clone(h)),
            Ok(other) => wrong_event(reference, other),
            Err(description) => HandlerOption::NotCallable(description),
        }
    }

    pub fn complete_option(&self, reference: &Value) -> HandlerOption<CompleteHandler<T>> {
        match self.lookup(reference) {
            Ok(NamedHandler::Complete(h)) => HandlerOption::Callable(Arc::clone(h)),
            Ok(other) => wrong_event(reference, other),
            Err(description) => HandlerOption::NotCallable(description),
        }
    }

    pub fn error_option(&self, reference: &Value) -> HandlerOption<ErrorHandler<T>> {
        match self.lookup(reference) {
            Ok(NamedHandler::Error(h)) => HandlerOption::Callable(Arc::clone(h)),
            Ok(other) => wrong_event(reference, other),
            Err(description) => HandlerOption::NotCallable(description),
        }
    }

    fn lookup(&self, reference: &Value) -> Result<&NamedHandler<T>, String> {
        let Value::String(name) = reference else {
            return Err(describe(reference));
        };
        self.handlers
            .get(name)
            .ok_or_else(|| format!("unknown handler '{name}'"))
    }
}

fn wrong_event<T, F>(reference: &Value, handler: &NamedHandler<T>) -> HandlerOption<F> {
    HandlerOption::NotCallable(format!(
        "handler {reference} which handles {}",
        handler.event()
    ))
}

/// Short description of a non-string handler value
fn describe(value: &Value) -> String {
    let kind = match value {
        Value::Null => return "null".to_string(),
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    format!("{kind} {value}")
}

impl<T> MergeOptions<T> {
    /// Build options from a declaration, resolving handler names in `registry`
    pub fn from_decl(decl: &OperatorDecl, registry: &HandlerRegistry<T>) -> Self {
        Self {
            singleton: decl.singleton,
            emits: decl.emits.clone(),
            on_next: decl.on_next.as_ref().map(|r| registry.next_option(r)),
            on_complete: decl.on_complete.as_ref().map(|r| registry.complete_option(r)),
            on_error: decl.on_error.as_ref().map(|r| registry.error_option(r)),
        }
    }
}
