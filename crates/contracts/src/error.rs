//! Layered error definitions
//!
//! `ContractError` covers the engine boundary and configuration files,
//! `MergeError` covers the operator and the callbacks it drives.

use thiserror::Error;

/// Engine boundary and configuration errors
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Target Errors =====
    /// A value target received a second write
    #[error("value target already resolved")]
    TargetAlreadyResolved,

    /// The read side of a target is gone
    #[error("target closed")]
    TargetClosed,

    // ===== Source Errors =====
    /// Subscribing to a source failed
    #[error("subscription failed: {message}")]
    SubscriptionFailed { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create subscription error
    pub fn subscription_failed(message: impl Into<String>) -> Self {
        Self::SubscriptionFailed {
            message: message.into(),
        }
    }
}

/// Error delivered by a source through its error channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SourceError {
    pub message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Operator errors
#[derive(Debug, Error)]
pub enum MergeError {
    /// Invalid operator option, raised at construction
    #[error("{operator}: invalid option '{option}': {message}")]
    Configuration {
        option: String,
        operator: String,
        message: String,
    },

    /// Emission surface misused from inside a callback
    #[error("usage error: {message}")]
    Usage { message: String },

    /// Subscribing to a source failed
    #[error("subscribing to source {index} failed: {source}")]
    Subscribe {
        index: usize,
        #[source]
        source: ContractError,
    },

    /// User callback failure
    #[error("callback failed: {message}")]
    Callback { message: String },

    /// The engine rejected a write to a target
    #[error("write to target '{target}' failed: {source}")]
    Target {
        target: String,
        #[source]
        source: ContractError,
    },
}

impl MergeError {
    /// Create configuration error
    pub fn configuration(
        option: impl Into<String>,
        operator: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            option: option.into(),
            operator: operator.into(),
            message: message.into(),
        }
    }

    /// Create usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create callback error
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }

    /// Create target write error
    pub fn target(target: impl Into<String>, source: ContractError) -> Self {
        Self::Target {
            target: target.into(),
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. })
    }
}
