//! Merge Pipeline Demo
//!
//! Two live temperature feeds merged into a `readings` output and an
//! `alerts` output, followed by a single-value lookup merged into a value
//! output.
//!
//! Run with: cargo run -p demos --bin merge_pipeline

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use channel_engine::{ChannelFactory, ChannelSource, Engine};
use contracts::{MergeError, Signal, SourceError, SourceSequence};
use merge_op::{MergeOperator, MergeOptions};
use observability::{init_with_config, LogFormat, ObservabilityConfig};
use tracing::info;

const ALERT_THRESHOLD: f64 = 30.0;

fn erase<T: Clone + Send + 'static>(
    sources: Vec<ChannelSource<T>>,
) -> Vec<Arc<dyn SourceSequence<T>>> {
    sources
        .into_iter()
        .map(|s| Arc::new(s) as Arc<dyn SourceSequence<T>>)
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_with_config(ObservabilityConfig {
        log_format: LogFormat::Pretty,
        metrics_port: None,
        default_log_level: "info".to_string(),
    })?;

    info!("Starting merge pipeline demo");
    merge_feeds().await?;
    resolve_lookup().await?;
    info!("Demo finished");
    Ok(())
}

/// Multi-output mode over two stream sources
async fn merge_feeds() -> anyhow::Result<()> {
    let engine = Engine::new()?;
    let (north_tx, north) = engine.stream_source::<f64>("north");
    let (south_tx, south) = engine.stream_source::<f64>("south");

    let completed = Arc::new(AtomicUsize::new(0));
    let operator = MergeOperator::new(
        erase(vec![north, south]),
        MergeOptions::new()
            .emits(["readings", "alerts"])
            .on_next(|dsl, celsius: f64, index| {
                dsl.emit_to("readings", celsius)?;
                if celsius > ALERT_THRESHOLD {
                    info!(?index, celsius, "threshold exceeded");
                    dsl.emit_to("alerts", celsius)?;
                }
                Ok(())
            })
            .on_complete(move |dsl, _| {
                if completed.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                    dsl.done()?;
                }
                Ok(())
            })
            .on_error(|_, error: SourceError, index| {
                Err(MergeError::callback(format!(
                    "feed {index:?} failed: {error}"
                )))
            }),
        &ChannelFactory,
    )?;
    operator.apply()?;

    let north_feed = tokio::spawn(async move {
        for celsius in [21.5, 24.0, 31.2, 28.9] {
            north_tx.next(celsius)?;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        north_tx.complete()
    });
    let south_feed = tokio::spawn(async move {
        for celsius in [18.0, 33.7, 19.4] {
            south_tx.next(celsius)?;
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        south_tx.complete()
    });
    north_feed.await??;
    south_feed.await??;

    let report = engine.join().await?;
    info!(
        subscriptions = report.subscriptions.len(),
        delivered = report.delivered(),
        "feeds merged"
    );

    for (name, target) in operator.outputs() {
        let values: Vec<f64> = target
            .output()
            .collect()
            .await
            .into_iter()
            .filter_map(Signal::into_item)
            .collect();
        info!(output = %name, ?values, stopped = target.is_stopped(), "output");
    }
    Ok(())
}

/// Single-output mode over one value source
async fn resolve_lookup() -> anyhow::Result<()> {
    let engine = Engine::new()?;
    let (lookup_tx, lookup) = engine.value_source::<String>("lookup");

    let operator = MergeOperator::new(
        erase(vec![lookup]),
        MergeOptions::new().on_next(|dsl, name: String, _| dsl.emit(format!("hello, {name}"))),
        &ChannelFactory,
    )?;
    info!(singleton = operator.is_singleton(), "lookup operator built");
    operator.apply()?;

    lookup_tx.next("merge".to_string())?;
    engine.join().await?;

    let output = operator.output()?;
    let signals = output.output().collect().await;
    info!(?signals, resolved = output.is_resolved(), "lookup resolved");
    Ok(())
}
