//! # Config Loader
//!
//! Operator declaration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON declaration files
//! - Validate declarations
//! - Resolve source paths relative to the declaration file
//! - Produce an `OperatorDecl`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let decl = ConfigLoader::load_from_path(Path::new("merge.toml")).unwrap();
//! println!("operator: {}", decl.operator_name());
//! ```

mod parser;
mod validator;

pub use contracts::{OperatorDecl, SourceDecl};
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load declarations from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a declaration from a file path
    ///
    /// Detects the format from the file extension (.toml / .json). Relative
    /// source paths are resolved against the file's directory.
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<OperatorDecl, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let mut decl = Self::load_from_str(&content, format)?;
        if let Some(base) = path.parent() {
            Self::resolve_source_paths(&mut decl, base);
        }
        Ok(decl)
    }

    /// Load a declaration from a string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<OperatorDecl, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize a declaration to TOML
    pub fn to_toml(decl: &OperatorDecl) -> Result<String, ContractError> {
        toml::to_string_pretty(decl)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a declaration to JSON
    pub fn to_json(decl: &OperatorDecl) -> Result<String, ContractError> {
        serde_json::to_string_pretty(decl)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Make relative source paths relative to `base`
    pub fn resolve_source_paths(decl: &mut OperatorDecl, base: &Path) {
        for source in &mut decl.sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
    }
}

impl ConfigLoader {
    /// Infer the format from the file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<OperatorDecl, ContractError> {
        let decl = parser::parse(content, format)?;
        validator::validate(&decl)?;
        Ok(decl)
    }
}
