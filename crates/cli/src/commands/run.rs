//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, PipelineStats};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading declaration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let decl = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        operator = decl.operator_name(),
        sources = decl.sources.len(),
        emits = ?decl.emits,
        "Declaration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - declaration is valid, exiting");
        print_decl_summary(&decl);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let pipeline = Pipeline::new(PipelineConfig {
        decl,
        timeout: (args.timeout != 0).then(|| Duration::from_secs(args.timeout)),
    });

    let shutdown_signal = setup_shutdown_signal();

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Pipeline execution failed")?;
            info!(
                delivered = stats.report.delivered(),
                duration_secs = stats.duration.as_secs_f64(),
                "Pipeline completed successfully"
            );
            print_outputs(&stats, args.json)?;
            if !args.json {
                stats.print_summary();
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    Ok(())
}

fn print_outputs(stats: &PipelineStats, json: bool) -> Result<()> {
    if json {
        let doc = serde_json::to_string_pretty(&stats.outputs)
            .context("Failed to serialize outputs")?;
        println!("{doc}");
        return Ok(());
    }

    for output in &stats.outputs {
        let state = if output.stopped { "stopped" } else { "open" };
        println!("[{}] ({state})", output.name);
        for value in &output.values {
            println!("  {value}");
        }
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM; never resolves if no handler can be installed
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print declaration summary for dry-run mode
fn print_decl_summary(decl: &contracts::OperatorDecl) {
    println!("\n=== Declaration Summary ===\n");
    println!("Operator: {}", decl.operator_name());
    match &decl.singleton {
        Some(singleton) => println!("Singleton: {singleton}"),
        None => println!("Singleton: (from sources)"),
    }
    match &decl.emits {
        Some(emits) => println!("Outputs: {}", emits.join(", ")),
        None => println!("Outputs: {} (implicit)", contracts::DEFAULT_EMIT),
    }

    println!("\nSources ({}):", decl.sources.len());
    for source in &decl.sources {
        println!("  - {} ({:?})", source.path.display(), source.kind);
    }

    println!("\nHandlers:");
    for (event, reference) in [
        ("on_next", &decl.on_next),
        ("on_complete", &decl.on_complete),
        ("on_error", &decl.on_error),
    ] {
        match reference {
            Some(reference) => println!("  {event}: {reference}"),
            None => println!("  {event}: (default)"),
        }
    }
    println!();
}
