//! Run statistics and output records.

use std::time::Duration;

use channel_engine::EngineReport;
use contracts::Signal;
use observability::OutputStatsAggregator;
use serde::Serialize;
use serde_json::Value;

/// Everything one output received
#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    pub name: String,
    pub values: Vec<Value>,
    /// Whether the stop signal arrived
    pub stopped: bool,
}

impl OutputRecord {
    pub fn from_signals(name: impl Into<String>, signals: Vec<Signal<Value>>) -> Self {
        let mut record = Self {
            name: name.into(),
            values: Vec::new(),
            stopped: false,
        };
        for signal in signals {
            match signal {
                Signal::Item(value) => record.values.push(value),
                Signal::Stop => record.stopped = true,
            }
        }
        record
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Public operator name
    pub operator: &'static str,

    /// Wall time from source setup to the last finished subscription
    pub duration: Duration,

    /// Finished subscriptions
    pub report: EngineReport,

    /// Per-output contents, in declared order
    pub outputs: Vec<OutputRecord>,

    /// Per-output statistics
    pub output_stats: OutputStatsAggregator,
}

impl PipelineStats {
    /// Events delivered to `on_next` per second
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.report.delivered() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Run Statistics ===");
        println!("Operator: {}", self.operator);
        println!("Duration: {:.3}s", self.duration.as_secs_f64());
        println!("Subscriptions: {}", self.report.subscriptions.len());
        println!(
            "Events delivered: {} ({:.1}/s)",
            self.report.delivered(),
            self.events_per_sec()
        );
        if self.report.errored() > 0 {
            println!("Sources ended by error: {}", self.report.errored());
        }
        println!();
        print!("{}", self.output_stats.summary());
    }
}
