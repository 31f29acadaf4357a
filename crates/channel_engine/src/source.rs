//! Channel-backed source sequences
//!
//! A [`SourceWriter`] pushes events into a [`ChannelSource`]. By default the
//! source keeps its full history, so a subscription made at any time sees the
//! whole sequence from the first event. History grows with every event; once
//! no more late subscribers are expected, [`SourceWriter::stop_replay`] drops
//! it and later values are only delivered live.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_channel::{unbounded, Sender};
use contracts::{ContractError, SequenceKind, SourceError, SourceSequence, Subscriber};
use tracing::{debug, trace, warn};

use crate::engine::Engine;
use crate::error::{EngineError, Result};

/// One event on a source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent<T> {
    Next(T),
    Error(SourceError),
    Complete,
}

impl<T> SourceEvent<T> {
    fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }
}

struct SourceState<T> {
    history: Vec<SourceEvent<T>>,
    subscribers: Vec<Sender<SourceEvent<T>>>,
    /// Record values for late subscribers
    replay: bool,
    /// Terminated, or the writer is gone
    closed: bool,
}

struct Shared<T> {
    label: String,
    kind: SequenceKind,
    state: Mutex<SourceState<T>>,
}

impl<T> Shared<T> {
    fn state(&self) -> MutexGuard<'_, SourceState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read side of a source, handed to operators
///
/// Each subscription gets its own unbounded queue, and the source retains
/// every event for replay until [`SourceWriter::stop_replay`] is called.
/// Long-running live sources should call it once their subscribers are in
/// place.
pub struct ChannelSource<T> {
    shared: Arc<Shared<T>>,
    engine: Engine,
}

impl<T> Clone for ChannelSource<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            engine: self.engine.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> ChannelSource<T> {
    pub(crate) fn pair(engine: Engine, label: String, kind: SequenceKind) -> (SourceWriter<T>, Self) {
        let shared = Arc::new(Shared {
            label,
            kind,
            state: Mutex::new(SourceState {
                history: Vec::new(),
                subscribers: Vec::new(),
                replay: true,
                closed: false,
            }),
        });
        let writer = SourceWriter {
            shared: Arc::clone(&shared),
        };
        (writer, Self { shared, engine })
    }
}

impl<T> ChannelSource<T> {
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Live subscriptions still receiving events
    pub fn subscriber_count(&self) -> usize {
        self.shared.state().subscribers.len()
    }
}

impl<T: Clone + Send + 'static> SourceSequence<T> for ChannelSource<T> {
    fn kind(&self) -> SequenceKind {
        self.shared.kind
    }

    fn subscribe(&self, subscriber: Subscriber<T>) -> std::result::Result<(), ContractError> {
        let (tx, rx) = unbounded();
        {
            let mut state = self.shared.state();
            for event in &state.history {
                tx.try_send(event.clone()).map_err(|_| {
                    ContractError::subscription_failed(format!(
                        "replay to '{}' failed",
                        self.shared.label
                    ))
                })?;
            }
            if !state.closed {
                state.subscribers.push(tx);
            }
        }
        self.engine
            .spawn_subscription(self.shared.label.clone(), rx, subscriber);
        Ok(())
    }
}

/// Write side of a source
///
/// Dropping the writer before the source terminates abandons it: live
/// subscriptions end with [`EngineError::SourceAbandoned`].
pub struct SourceWriter<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> SourceWriter<T> {
    /// Push a value; on a value source this also completes it
    pub fn next(&self, value: T) -> Result<()> {
        self.publish(SourceEvent::Next(value))?;
        if self.shared.kind.is_value() {
            self.publish(SourceEvent::Complete)?;
        }
        Ok(())
    }

    /// Fail the source
    pub fn error(&self, error: SourceError) -> Result<()> {
        warn!(source = %self.shared.label, error = %error, "source failed");
        self.publish(SourceEvent::Error(error))
    }

    pub fn complete(&self) -> Result<()> {
        self.publish(SourceEvent::Complete)
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Drop the recorded values and stop recording new ones
    ///
    /// Subscriptions made afterwards only see values published after they
    /// subscribe. The terminal event is still kept, so a late subscriber of a
    /// finished source is completed (or failed) right away.
    pub fn stop_replay(&self) {
        let mut state = self.shared.state();
        state.replay = false;
        let dropped = state.history.len();
        state.history.retain(SourceEvent::is_terminal);
        debug!(source = %self.shared.label, dropped, "replay history dropped");
    }

    fn publish(&self, event: SourceEvent<T>) -> Result<()> {
        let mut state = self.shared.state();
        if state.closed {
            return Err(EngineError::source_closed(&self.shared.label));
        }

        trace!(source = %self.shared.label, terminal = event.is_terminal(), "publish");
        // A failed send means that subscription already ended
        state
            .subscribers
            .retain(|tx| tx.try_send(event.clone()).is_ok());

        if event.is_terminal() {
            state.closed = true;
            state.subscribers.clear();
            debug!(source = %self.shared.label, "source terminated");
        }
        if state.replay || event.is_terminal() {
            state.history.push(event);
        }
        Ok(())
    }
}

impl<T> Drop for SourceWriter<T> {
    fn drop(&mut self) {
        let mut state = self.shared.state();
        if !state.closed {
            debug!(source = %self.shared.label, "writer dropped before completion");
            state.closed = true;
            state.subscribers.clear();
        }
    }
}
