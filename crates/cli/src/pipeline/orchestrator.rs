//! Pipeline orchestrator - builds the operator from a declaration and runs
//! it over the declared inputs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use channel_engine::{ChannelFactory, ChannelTarget, Engine};
use contracts::{OperatorDecl, SourceSequence};
use merge_op::{builtin_registry, MergeOperator, MergeOptions};
use observability::OutputStatsAggregator;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::input::read_json_lines;
use super::stats::{OutputRecord, PipelineStats};
use crate::error::{CliError, Result};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Operator declaration, source paths already resolved
    pub decl: OperatorDecl,

    /// Limit for all subscriptions to finish (None = no timeout)
    pub timeout: Option<Duration>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the operator until every subscription has finished
    #[instrument(
        name = "pipeline_run",
        skip(self),
        fields(operator = self.config.decl.operator_name())
    )]
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let decl = &self.config.decl;

        let engine = Engine::new()?;
        let sources = Self::open_sources(&engine, decl)?;

        let registry = builtin_registry(sources.len());
        let options = MergeOptions::from_decl(decl, &registry);
        let operator = MergeOperator::new(sources, options, &ChannelFactory)?;
        operator.apply()?;

        info!(
            operator = operator.name(),
            sources = operator.source_count(),
            outputs = operator.outputs().len(),
            singleton = operator.is_singleton(),
            "operator applied"
        );

        let report = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, engine.join())
                .await
                .map_err(|_| CliError::Timeout {
                    secs: limit.as_secs(),
                })??,
            None => engine.join().await?,
        };

        let (outputs, output_stats) = Self::collect_outputs(operator.outputs());
        for output in outputs.iter().filter(|o| !o.stopped) {
            warn!(output = %output.name, "output was never closed");
        }

        Ok(PipelineStats {
            operator: operator.name(),
            duration: start_time.elapsed(),
            report,
            outputs,
            output_stats,
        })
    }

    fn open_sources(
        engine: &Engine,
        decl: &OperatorDecl,
    ) -> Result<Vec<Arc<dyn SourceSequence<Value>>>> {
        let mut sources: Vec<Arc<dyn SourceSequence<Value>>> = Vec::new();
        for source in &decl.sources {
            let values = read_json_lines(&source.path)?;
            let label = source
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| source.path.display().to_string());
            debug!(source = %label, kind = ?source.kind, values = values.len(), "input loaded");
            sources.push(Arc::new(engine.source_from_iter(label, source.kind, values)?));
        }
        Ok(sources)
    }

    /// Read everything queued on each output
    ///
    /// All subscriptions have finished, so nothing more can arrive.
    fn collect_outputs(
        targets: &[(String, ChannelTarget<Value>)],
    ) -> (Vec<OutputRecord>, OutputStatsAggregator) {
        let mut aggregator = OutputStatsAggregator::new();
        let mut records = Vec::with_capacity(targets.len());

        for (name, target) in targets {
            aggregator.track(name);
            let record = OutputRecord::from_signals(name, target.output().drain_ready());
            for value in &record.values {
                aggregator.record_item(name, value.as_f64());
            }
            if record.stopped {
                aggregator.record_stop(name);
            }
            records.push(record);
        }

        (records, aggregator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SequenceKind, SourceDecl};
    use serde_json::json;
    use std::path::Path;

    fn write_input(dir: &Path, name: &str, lines: &[&str]) -> SourceDecl {
        let path = dir.join(name);
        std::fs::write(&path, lines.join("\n")).unwrap();
        SourceDecl {
            path,
            kind: SequenceKind::Stream,
        }
    }

    async fn run(decl: OperatorDecl) -> Result<PipelineStats> {
        Pipeline::new(PipelineConfig {
            decl,
            timeout: Some(Duration::from_secs(5)),
        })
        .run()
        .await
    }

    #[tokio::test]
    async fn test_double_single_source() {
        let dir = tempfile::tempdir().unwrap();
        let decl = OperatorDecl {
            on_next: Some(json!("double")),
            sources: vec![write_input(dir.path(), "n.jsonl", &["1", "2", "3"])],
            ..Default::default()
        };

        let stats = run(decl).await.unwrap();
        assert_eq!(stats.operator, "merge");
        assert_eq!(stats.outputs.len(), 1);
        assert_eq!(stats.outputs[0].values, vec![json!(2), json!(4), json!(6)]);
        assert!(stats.outputs[0].stopped);
        assert_eq!(stats.report.delivered(), 3);
    }

    #[tokio::test]
    async fn test_route_two_sources() {
        let dir = tempfile::tempdir().unwrap();
        let decl = OperatorDecl {
            emits: Some(vec!["left".into(), "right".into()]),
            on_next: Some(json!("route_by_source")),
            on_complete: Some(json!("done_when_all_complete")),
            sources: vec![
                write_input(dir.path(), "a.jsonl", &["1", "2"]),
                write_input(dir.path(), "b.jsonl", &["\"x\""]),
            ],
            ..Default::default()
        };

        let stats = run(decl).await.unwrap();
        assert_eq!(stats.operator, "multi_merge");
        assert_eq!(stats.outputs[0].values, vec![json!(1), json!(2)]);
        assert_eq!(stats.outputs[1].values, vec![json!("x")]);
        assert!(stats.outputs.iter().all(|o| o.stopped));
        assert_eq!(stats.output_stats.summary().total_items, 3);
    }

    #[tokio::test]
    async fn test_non_callable_handler_fails_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let decl = OperatorDecl {
            on_complete: Some(json!(42)),
            sources: vec![write_input(dir.path(), "n.jsonl", &["1"])],
            ..Default::default()
        };

        match run(decl).await {
            Err(CliError::Operator(e)) => {
                assert!(e.is_configuration());
                assert!(e.to_string().contains("on_complete"));
            }
            other => panic!("unexpected result: {:?}", other.map(|s| s.operator)),
        }
    }

    #[tokio::test]
    async fn test_handler_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let decl = OperatorDecl {
            on_next: Some(json!("double")),
            sources: vec![write_input(dir.path(), "n.jsonl", &["\"not a number\""])],
            ..Default::default()
        };

        assert!(matches!(run(decl).await, Err(CliError::Engine(_))));
    }
}
