//! Merge operator metrics
//!
//! Thin helpers over the `metrics` facade, plus an in-memory aggregator the
//! CLI uses to summarize what reached each output.

use std::collections::BTreeMap;
use std::time::Duration;

use metrics::{counter, histogram};

/// Record one event delivered by a source subscription
///
/// `event` is one of `next`, `complete`, `error`.
pub fn record_event_delivered(source: &str, event: &'static str) {
    counter!(
        "mergeflow_events_delivered_total",
        "source" => source.to_string(),
        "event" => event
    )
    .increment(1);
}

/// Record one successful emit to a target
pub fn record_emit(target: &str) {
    counter!("mergeflow_emits_total", "target" => target.to_string()).increment(1);
}

/// Record one `done()` call and the number of targets it closed
pub fn record_done(closed: usize) {
    let effective = if closed > 0 { "true" } else { "false" };
    counter!("mergeflow_done_calls_total", "effective" => effective).increment(1);
    if closed > 0 {
        counter!("mergeflow_targets_closed_total").increment(closed as u64);
    }
}

/// Record time spent waiting for the callback guard
pub fn record_guard_wait(wait: Duration) {
    histogram!("mergeflow_guard_wait_seconds").record(wait.as_secs_f64());
}

/// Record the end of a subscription
pub fn record_subscription_finished(source: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "mergeflow_subscriptions_finished_total",
        "source" => source.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Per-output statistics aggregator
///
/// Fed with every signal read from the operator outputs.
#[derive(Debug, Clone, Default)]
pub struct OutputStatsAggregator {
    targets: BTreeMap<String, TargetStats>,
}

/// Statistics for one output
#[derive(Debug, Clone, Default)]
pub struct TargetStats {
    /// Items received
    pub items: u64,
    /// Whether the stop signal was received
    pub stopped: bool,
    /// Numeric items
    pub numeric: RunningStats,
}

impl OutputStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an output so it shows up even if nothing reaches it
    pub fn track(&mut self, target: &str) {
        self.targets.entry(target.to_string()).or_default();
    }

    /// Record one item; `numeric` is its value when it is a number
    pub fn record_item(&mut self, target: &str, numeric: Option<f64>) {
        let stats = self.targets.entry(target.to_string()).or_default();
        stats.items += 1;
        if let Some(value) = numeric {
            stats.numeric.push(value);
        }
    }

    /// Record the stop signal
    pub fn record_stop(&mut self, target: &str) {
        self.targets.entry(target.to_string()).or_default().stopped = true;
    }

    pub fn get(&self, target: &str) -> Option<&TargetStats> {
        self.targets.get(target)
    }

    pub fn summary(&self) -> OutputSummary {
        OutputSummary {
            total_items: self.targets.values().map(|t| t.items).sum(),
            targets: self
                .targets
                .iter()
                .map(|(name, stats)| {
                    (
                        name.clone(),
                        (stats.items, stats.stopped, StatsSummary::from(&stats.numeric)),
                    )
                })
                .collect(),
        }
    }
}

/// Summary report
#[derive(Debug, Clone, Default)]
pub struct OutputSummary {
    pub total_items: u64,
    /// name -> (items, stopped, numeric stats)
    pub targets: BTreeMap<String, (u64, bool, StatsSummary)>,
}

impl std::fmt::Display for OutputSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Output Summary ===")?;
        writeln!(f, "Total items: {}", self.total_items)?;
        for (name, (items, stopped, numeric)) in &self.targets {
            let state = if *stopped { "stopped" } else { "open" };
            writeln!(f, "  {name}: {items} items ({state}), values: {numeric}")?;
        }
        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
