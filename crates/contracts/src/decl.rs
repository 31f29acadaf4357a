//! OperatorDecl - Config Loader output
//!
//! Declarative description of one merge operator: modes, emit names, handler
//! references and the input files the CLI feeds into it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{operator_name, SequenceKind};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Declared merge operator
///
/// Handler options stay raw values: a handler is referenced by name, and any
/// other value is reported as not callable when the operator is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct OperatorDecl {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Force singleton (value) targets on or off
    #[serde(default)]
    pub singleton: Option<bool>,

    /// Named outputs; supplying it selects multi-output mode
    #[serde(default)]
    #[validate(length(min = 1))]
    pub emits: Option<Vec<String>>,

    /// "Next value" handler reference
    #[serde(default)]
    pub on_next: Option<serde_json::Value>,

    /// Completion handler reference
    #[serde(default)]
    pub on_complete: Option<serde_json::Value>,

    /// Error handler reference
    #[serde(default)]
    pub on_error: Option<serde_json::Value>,

    /// Input sources (JSON lines files)
    #[serde(default)]
    pub sources: Vec<SourceDecl>,
}

impl OperatorDecl {
    /// Whether `emits` was supplied explicitly
    pub fn emits_supplied(&self) -> bool {
        self.emits.is_some()
    }

    /// Public operator name for this declaration
    pub fn operator_name(&self) -> &'static str {
        operator_name(self.emits_supplied())
    }
}

/// Declared input source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDecl {
    /// JSON lines file, one value per line
    pub path: PathBuf,

    /// Stream or value source
    #[serde(default)]
    pub kind: SequenceKind,
}
