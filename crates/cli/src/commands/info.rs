//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{OperatorDecl, DEFAULT_EMIT};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Declaration info for JSON output
#[derive(Serialize)]
struct DeclInfo {
    version: String,
    operator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    singleton: Option<bool>,
    outputs: Vec<String>,
    sources: Vec<SourceInfo>,
    handlers: HandlerInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    builtin_handlers: Vec<String>,
}

#[derive(Serialize)]
struct SourceInfo {
    path: String,
    kind: String,
}

#[derive(Serialize)]
struct HandlerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    on_next: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    on_complete: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    on_error: Option<serde_json::Value>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading declaration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let decl = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_decl_info(&decl, args);
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize info")?;
        println!("{}", json);
    } else {
        print_decl_info(&decl, args);
    }

    Ok(())
}

fn output_names(decl: &OperatorDecl) -> Vec<String> {
    decl.emits
        .clone()
        .unwrap_or_else(|| vec![DEFAULT_EMIT.to_string()])
}

fn builtin_names(decl: &OperatorDecl) -> Vec<String> {
    merge_op::builtin_registry(decl.sources.len())
        .names()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn build_decl_info(decl: &OperatorDecl, args: &InfoArgs) -> DeclInfo {
    DeclInfo {
        version: format!("{:?}", decl.version),
        operator: decl.operator_name().to_string(),
        singleton: decl.singleton,
        outputs: output_names(decl),
        sources: decl
            .sources
            .iter()
            .map(|s| SourceInfo {
                path: s.path.display().to_string(),
                kind: format!("{:?}", s.kind),
            })
            .collect(),
        handlers: HandlerInfo {
            on_next: decl.on_next.clone(),
            on_complete: decl.on_complete.clone(),
            on_error: decl.on_error.clone(),
        },
        builtin_handlers: if args.handlers {
            builtin_names(decl)
        } else {
            Vec::new()
        },
    }
}

fn print_decl_info(decl: &OperatorDecl, args: &InfoArgs) {
    println!("=== Merge Operator ===\n");
    println!("Operator: {} ({:?})", decl.operator_name(), decl.version);
    if let Some(singleton) = decl.singleton {
        println!("Singleton: {singleton}");
    }

    let outputs = output_names(decl);
    println!("\nOutputs ({}):", outputs.len());
    for name in &outputs {
        println!("  - {name}");
    }

    println!("\nSources ({}):", decl.sources.len());
    for (idx, source) in decl.sources.iter().enumerate() {
        println!("  [{idx}] {} ({:?})", source.path.display(), source.kind);
    }

    println!("\nHandlers:");
    let handlers = [
        ("on_next", &decl.on_next),
        ("on_complete", &decl.on_complete),
        ("on_error", &decl.on_error),
    ];
    for (event, reference) in handlers {
        if let Some(reference) = reference {
            println!("  {event}: {reference}");
        }
    }

    if args.handlers {
        println!("\nBuilt-in handlers:");
        for name in builtin_names(decl) {
            println!("  - {name}");
        }
    }
    println!();
}
