//! Engine - runtime handle plus subscription task registry

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_channel::Receiver;
use contracts::{SequenceKind, Subscriber};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::error::{EngineError, Result};
use crate::source::{ChannelSource, SourceEvent, SourceWriter};

/// How a subscription ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The source completed
    Completed,
    /// The source failed and the error handler ran
    Errored,
}

/// Outcome of one finished subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionReport {
    pub id: u64,
    pub label: String,
    /// `on_next` invocations
    pub delivered: u64,
    pub termination: Termination,
}

/// Outcome of [`Engine::join`]
#[derive(Debug, Clone, Default)]
pub struct EngineReport {
    pub subscriptions: Vec<SubscriptionReport>,
}

impl EngineReport {
    /// Total `on_next` invocations across subscriptions
    pub fn delivered(&self) -> u64 {
        self.subscriptions.iter().map(|s| s.delivered).sum()
    }

    pub fn errored(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|s| s.termination == Termination::Errored)
            .count()
    }
}

struct SubscriptionTask {
    id: u64,
    label: String,
    handle: JoinHandle<Result<SubscriptionReport>>,
}

struct EngineInner {
    runtime: Handle,
    tasks: Mutex<Vec<SubscriptionTask>>,
    next_id: AtomicU64,
}

/// Channel-backed sequence engine
///
/// Every subscription runs as its own tokio task that invokes the subscriber
/// callbacks synchronously, one event at a time, in emission order.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Engine on the current tokio runtime
    pub fn new() -> Result<Self> {
        Ok(Self::with_handle(Handle::try_current()?))
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                runtime,
                tasks: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Unbounded stream source and its writer
    pub fn stream_source<T: Clone + Send + 'static>(
        &self,
        label: impl Into<String>,
    ) -> (SourceWriter<T>, ChannelSource<T>) {
        ChannelSource::pair(self.clone(), label.into(), SequenceKind::Stream)
    }

    /// Single-resolution source and its writer
    pub fn value_source<T: Clone + Send + 'static>(
        &self,
        label: impl Into<String>,
    ) -> (SourceWriter<T>, ChannelSource<T>) {
        ChannelSource::pair(self.clone(), label.into(), SequenceKind::Value)
    }

    /// Source pre-filled from `items`, then completed
    ///
    /// A value source takes the first item only.
    pub fn source_from_iter<T, I>(
        &self,
        label: impl Into<String>,
        kind: SequenceKind,
        items: I,
    ) -> Result<ChannelSource<T>>
    where
        T: Clone + Send + 'static,
        I: IntoIterator<Item = T>,
    {
        let (writer, source) = ChannelSource::pair(self.clone(), label.into(), kind);
        let mut items = items.into_iter();
        if kind.is_value() {
            match items.next() {
                Some(value) => writer.next(value)?,
                None => writer.complete()?,
            }
        } else {
            for value in items {
                writer.next(value)?;
            }
            writer.complete()?;
        }
        Ok(source)
    }

    /// Subscriptions spawned and not yet joined
    pub fn pending(&self) -> usize {
        self.tasks().len()
    }

    /// Wait for every subscription to finish
    ///
    /// Failed subscriptions are logged; the first failure is returned after
    /// all tasks have been awaited. Tasks spawned while joining are awaited
    /// too.
    #[instrument(name = "engine_join", skip(self))]
    pub async fn join(&self) -> Result<EngineReport> {
        let mut report = EngineReport::default();
        let mut first_error = None;

        loop {
            let batch = std::mem::take(&mut *self.tasks());
            if batch.is_empty() {
                break;
            }
            for task in batch {
                match task.handle.await {
                    Ok(Ok(finished)) => report.subscriptions.push(finished),
                    Ok(Err(e)) => {
                        error!(id = task.id, source = %task.label, error = %e, "subscription failed");
                        first_error.get_or_insert(e);
                    }
                    Err(join_error) => {
                        error!(id = task.id, source = %task.label, error = %join_error, "subscription task panicked");
                        first_error.get_or_insert(EngineError::TaskPanicked {
                            label: task.label,
                            message: join_error.to_string(),
                        });
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(
                    subscriptions = report.subscriptions.len(),
                    delivered = report.delivered(),
                    "all subscriptions finished"
                );
                Ok(report)
            }
        }
    }

    pub(crate) fn spawn_subscription<T: Send + 'static>(
        &self,
        label: String,
        events: Receiver<SourceEvent<T>>,
        subscriber: Subscriber<T>,
    ) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let task_label = label.clone();
        let handle = self.inner.runtime.spawn(async move {
            let result = deliver(id, task_label.clone(), events, subscriber).await;
            observability::record_subscription_finished(&task_label, result.is_ok());
            result
        });
        debug!(id, source = %label, "subscription spawned");
        self.tasks().push(SubscriptionTask { id, label, handle });
        id
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, Vec<SubscriptionTask>> {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Subscription task body
///
/// A callback error ends the subscription. A source error is terminal: the
/// error handler runs once and nothing further is delivered.
#[instrument(name = "subscription", skip(label, events, subscriber), fields(source = %label))]
async fn deliver<T>(
    id: u64,
    label: String,
    events: Receiver<SourceEvent<T>>,
    mut subscriber: Subscriber<T>,
) -> Result<SubscriptionReport> {
    let mut delivered = 0;

    while let Ok(event) = events.recv().await {
        match event {
            SourceEvent::Next(value) => {
                observability::record_event_delivered(&label, "next");
                (subscriber.on_next)(value).map_err(|e| EngineError::handler(&label, e))?;
                delivered += 1;
            }
            SourceEvent::Error(error) => {
                observability::record_event_delivered(&label, "error");
                let Some(on_error) = subscriber.on_error.as_mut() else {
                    return Err(EngineError::UnhandledSourceError { label, error });
                };
                on_error(error).map_err(|e| EngineError::handler(&label, e))?;
                return Ok(SubscriptionReport {
                    id,
                    label,
                    delivered,
                    termination: Termination::Errored,
                });
            }
            SourceEvent::Complete => {
                observability::record_event_delivered(&label, "complete");
                (subscriber.on_complete)().map_err(|e| EngineError::handler(&label, e))?;
                debug!(delivered, "source completed");
                return Ok(SubscriptionReport {
                    id,
                    label,
                    delivered,
                    termination: Termination::Completed,
                });
            }
        }
    }

    Err(EngineError::SourceAbandoned { label })
}
