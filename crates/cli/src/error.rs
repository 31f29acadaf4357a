//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Declaration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Input file could not be read
    #[error("Failed to read input {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input line is not valid JSON
    #[error("Invalid JSON in {path} at line {line}: {message}")]
    InputParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Subscriptions did not finish in time
    #[error("Subscriptions did not finish within {secs}s")]
    Timeout { secs: u64 },

    /// Operator construction or subscription error
    #[error("Operator error: {0}")]
    Operator(#[from] contracts::MergeError),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] channel_engine::EngineError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn input_parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::InputParse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
