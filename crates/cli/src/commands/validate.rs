//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::OperatorDecl;
use merge_op::{builtin_registry, HandlerSet, MergeOptions};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<DeclSummary>,
}

#[derive(Serialize)]
struct DeclSummary {
    version: String,
    operator: String,
    source_count: usize,
    output_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating declaration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return invalid(config_path, format!("File not found: {}", args.config.display()));
    }

    let decl = match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(decl) => decl,
        Err(e) => return invalid(config_path, e.to_string()),
    };

    // Same handler resolution the operator performs at construction
    if let Err(e) = check_handlers(&decl) {
        return invalid(config_path, e.to_string());
    }

    let warnings = collect_warnings(&decl);
    ValidationResult {
        valid: true,
        config_path,
        error: None,
        warnings: (!warnings.is_empty()).then_some(warnings),
        summary: Some(DeclSummary {
            version: format!("{:?}", decl.version),
            operator: decl.operator_name().to_string(),
            source_count: decl.sources.len(),
            output_count: decl.emits.as_ref().map_or(1, Vec::len),
        }),
    }
}

fn invalid(config_path: String, error: String) -> ValidationResult {
    ValidationResult {
        valid: false,
        config_path,
        error: Some(error),
        warnings: None,
        summary: None,
    }
}

fn check_handlers(decl: &OperatorDecl) -> Result<(), contracts::MergeError> {
    let registry = builtin_registry(decl.sources.len());
    let options = MergeOptions::from_decl(decl, &registry);
    HandlerSet::<Value>::resolve(
        options.on_next,
        options.on_complete,
        options.on_error,
        decl.operator_name(),
    )
    .map(|_| ())
}

/// Collect non-fatal issues
fn collect_warnings(decl: &OperatorDecl) -> Vec<String> {
    let mut warnings = Vec::new();

    for source in &decl.sources {
        if !source.path.exists() {
            warnings.push(format!("Input file '{}' does not exist", source.path.display()));
        }
    }

    let closes_outputs = matches!(
        decl.on_complete.as_ref().and_then(Value::as_str),
        Some("done" | "done_when_all_complete")
    );
    if decl.sources.len() > 1 && !closes_outputs {
        warnings.push(
            "Several sources and no closing on_complete handler - outputs will stay open"
                .to_string(),
        );
    }

    if decl.on_error.is_none() {
        warnings.push("No on_error handler - a failing input fails the run".to_string());
    }

    if decl.on_next.as_ref().and_then(Value::as_str) == Some("route_by_source")
        && !decl.emits_supplied()
    {
        warnings.push("route_by_source needs named outputs (emits)".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Operator: {}", summary.operator);
            println!("  Sources: {}", summary.source_count);
            println!("  Outputs: {}", summary.output_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
