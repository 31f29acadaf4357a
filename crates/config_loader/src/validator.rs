//! Declaration validation
//!
//! Rules:
//! - field shapes declared on `OperatorDecl` (`validator` derive)
//! - at least one source, every source path non-empty
//! - emit names non-empty, unique, not the reserved implicit name
//!
//! Handler references are not checked here: a reference that cannot be
//! resolved is reported when the operator is built, under the operator's
//! public name.

use std::collections::HashSet;

use ::validator::Validate;
use contracts::{ContractError, OperatorDecl, DEFAULT_EMIT};

/// Validate an operator declaration
///
/// Returns the first error found.
pub fn validate(decl: &OperatorDecl) -> Result<(), ContractError> {
    validate_shape(decl)?;
    validate_sources(decl)?;
    validate_emits(decl)?;
    Ok(())
}

fn validate_shape(decl: &OperatorDecl) -> Result<(), ContractError> {
    decl.validate().map_err(|errors| {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "decl".to_string());
        ContractError::config_validation(field, errors.to_string())
    })
}

fn validate_sources(decl: &OperatorDecl) -> Result<(), ContractError> {
    if decl.sources.is_empty() {
        return Err(ContractError::config_validation(
            "sources",
            "at least one source is required",
        ));
    }
    for (idx, source) in decl.sources.iter().enumerate() {
        if source.path.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                format!("sources[{idx}].path"),
                "source path cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_emits(decl: &OperatorDecl) -> Result<(), ContractError> {
    let Some(emits) = &decl.emits else {
        return Ok(());
    };

    let mut seen = HashSet::new();
    for (idx, name) in emits.iter().enumerate() {
        if name.is_empty() {
            return Err(ContractError::config_validation(
                format!("emits[{idx}]"),
                "emit name cannot be empty",
            ));
        }
        if name == DEFAULT_EMIT {
            return Err(ContractError::config_validation(
                format!("emits[{idx}]"),
                format!("'{DEFAULT_EMIT}' is reserved"),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ContractError::config_validation(
                format!("emits[{idx}]"),
                format!("duplicate emit name '{name}'"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SequenceKind, SourceDecl};

    fn minimal_decl() -> OperatorDecl {
        OperatorDecl {
            sources: vec![SourceDecl {
                path: "numbers.jsonl".into(),
                kind: SequenceKind::Stream,
            }],
            ..Default::default()
        }
    }

    fn field_of(result: Result<(), ContractError>) -> String {
        match result {
            Err(ContractError::ConfigValidation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_decl() {
        assert!(validate(&minimal_decl()).is_ok());

        let mut decl = minimal_decl();
        decl.emits = Some(vec!["a".into(), "b".into()]);
        assert!(validate(&decl).is_ok());
    }

    #[test]
    fn test_empty_emits() {
        let mut decl = minimal_decl();
        decl.emits = Some(Vec::new());
        assert_eq!(field_of(validate(&decl)), "emits");
    }

    #[test]
    fn test_duplicate_emit_name() {
        let mut decl = minimal_decl();
        decl.emits = Some(vec!["a".into(), "a".into()]);
        assert_eq!(field_of(validate(&decl)), "emits[1]");
    }

    #[test]
    fn test_reserved_emit_name() {
        let mut decl = minimal_decl();
        decl.emits = Some(vec![DEFAULT_EMIT.into()]);
        assert_eq!(field_of(validate(&decl)), "emits[0]");
    }

    #[test]
    fn test_missing_sources() {
        let mut decl = minimal_decl();
        decl.sources.clear();
        assert_eq!(field_of(validate(&decl)), "sources");
    }

    #[test]
    fn test_empty_source_path() {
        let mut decl = minimal_decl();
        decl.sources[0].path = "".into();
        assert_eq!(field_of(validate(&decl)), "sources[0].path");
    }

    #[test]
    fn test_non_callable_handler_passes_validation() {
        let mut decl = minimal_decl();
        decl.on_next = Some(serde_json::json!(42));
        assert!(validate(&decl).is_ok());
    }
}
