//! Sequence abstractions consumed from the engine.

use serde::{Deserialize, Serialize};

use crate::{ContractError, Subscriber};

/// Sequence kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    /// Unbounded stream, closed by a stop signal
    #[default]
    Stream,
    /// Single-resolution value, complete once bound
    Value,
}

impl SequenceKind {
    /// Whether this is a single-resolution ("value") sequence
    pub fn is_value(self) -> bool {
        matches!(self, Self::Value)
    }
}

/// What a downstream consumer reads from a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<T> {
    /// A bound value
    Item(T),
    /// Terminal end-of-stream sentinel
    Stop,
}

impl<T> Signal<T> {
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }

    pub fn into_item(self) -> Option<T> {
        match self {
            Self::Item(value) => Some(value),
            Self::Stop => None,
        }
    }
}

/// Read-only sequence owned by the engine
///
/// The engine delivers events to the subscriber on its own tasks. Events of
/// one source arrive in emission order; nothing is promised across sources.
pub trait SourceSequence<T>: Send + Sync {
    /// Sequence kind
    fn kind(&self) -> SequenceKind;

    /// Register a handler set
    ///
    /// Each call creates an independent subscription.
    fn subscribe(&self, subscriber: Subscriber<T>) -> Result<(), ContractError>;
}

/// Write-only sequence created by the operator
pub trait TargetSequence<T>: Send + Sync {
    /// Sequence kind
    fn kind(&self) -> SequenceKind;

    /// Append a value (stream) or resolve the slot (value)
    ///
    /// # Errors
    /// The engine may reject a second write to a value target.
    fn bind(&self, value: T) -> Result<(), ContractError>;

    /// Send the terminal stop signal
    fn stop(&self) -> Result<(), ContractError>;
}

/// Creates targets on behalf of the operator
pub trait SequenceFactory<T> {
    /// Engine target type, cloned so the operator and the engine can both hold it
    type Target: TargetSequence<T> + Clone + 'static;

    fn create(&self, kind: SequenceKind) -> Self::Target;
}

/// Whether the given source is a single-resolution sequence
pub fn is_value_sequence<T>(source: &dyn SourceSequence<T>) -> bool {
    source.kind().is_value()
}
