//! Engine error types

use contracts::{ContractError, MergeError, SourceError};
use thiserror::Error;

/// Engine-specific errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// No tokio runtime to spawn subscription tasks on
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// A subscriber callback returned an error
    #[error("handler failed for source '{label}': {error}")]
    Handler {
        label: String,
        #[source]
        error: MergeError,
    },

    /// A source failed and the subscriber has no error handler
    #[error("source '{label}' failed with no error handler registered: {error}")]
    UnhandledSourceError { label: String, error: SourceError },

    /// The writer was dropped before the source terminated
    #[error("source '{label}' was dropped before completing")]
    SourceAbandoned { label: String },

    /// Write after the source terminated
    #[error("source '{label}' already terminated")]
    SourceClosed { label: String },

    /// A subscription task panicked
    #[error("subscription task for source '{label}' panicked: {message}")]
    TaskPanicked { label: String, message: String },

    /// Engine boundary error
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
}

impl EngineError {
    pub fn handler(label: impl Into<String>, error: MergeError) -> Self {
        Self::Handler {
            label: label.into(),
            error,
        }
    }

    pub fn source_closed(label: impl Into<String>) -> Self {
        Self::SourceClosed {
            label: label.into(),
        }
    }

    /// Label of the source the error concerns, if any
    pub fn source_label(&self) -> Option<&str> {
        match self {
            Self::Handler { label, .. }
            | Self::UnhandledSourceError { label, .. }
            | Self::SourceAbandoned { label }
            | Self::SourceClosed { label }
            | Self::TaskPanicked { label, .. } => Some(label),
            Self::NoRuntime(_) | Self::Contract(_) => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;
