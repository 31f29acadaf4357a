//! Channel-backed target sequences and their read side

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{unbounded, Receiver, Sender};
use contracts::{ContractError, SequenceFactory, SequenceKind, Signal, TargetSequence};

/// Write side of an operator output
///
/// Clones share one queue. A value target accepts one write; a resolved
/// value target rejects both further writes and the stop signal.
pub struct ChannelTarget<T> {
    kind: SequenceKind,
    tx: Sender<Signal<T>>,
    rx: Receiver<Signal<T>>,
    resolved: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl<T> ChannelTarget<T> {
    pub fn new(kind: SequenceKind) -> Self {
        let (tx, rx) = unbounded();
        Self {
            kind,
            tx,
            rx,
            resolved: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Read side; every reader drains the same queue
    pub fn output(&self) -> Output<T> {
        Output {
            kind: self.kind,
            rx: self.rx.clone(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    fn push(&self, signal: Signal<T>) -> Result<(), ContractError> {
        self.tx
            .try_send(signal)
            .map_err(|_| ContractError::TargetClosed)
    }
}

impl<T> Clone for ChannelTarget<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            resolved: Arc::clone(&self.resolved),
            stopped: Arc::clone(&self.stopped),
        }
    }
}

impl<T: Send> TargetSequence<T> for ChannelTarget<T> {
    fn kind(&self) -> SequenceKind {
        self.kind
    }

    fn bind(&self, value: T) -> Result<(), ContractError> {
        if self.is_stopped() {
            return Err(ContractError::TargetClosed);
        }
        if self.kind.is_value() && self.resolved.swap(true, Ordering::AcqRel) {
            return Err(ContractError::TargetAlreadyResolved);
        }
        self.push(Signal::Item(value))
    }

    fn stop(&self) -> Result<(), ContractError> {
        if self.kind.is_value() && self.is_resolved() {
            return Err(ContractError::TargetAlreadyResolved);
        }
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Err(ContractError::TargetClosed);
        }
        self.push(Signal::Stop)?;
        self.tx.close();
        Ok(())
    }
}

/// Read side of a [`ChannelTarget`]
pub struct Output<T> {
    kind: SequenceKind,
    rx: Receiver<Signal<T>>,
}

impl<T> Output<T> {
    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    /// Next signal; `None` once the target is stopped and drained
    pub async fn recv(&self) -> Option<Signal<T>> {
        self.rx.recv().await.ok()
    }

    /// Read until the sequence is complete
    ///
    /// A stream completes with [`Signal::Stop`] (included in the result); a
    /// value completes with its single signal, either the value or `Stop`.
    pub async fn collect(self) -> Vec<Signal<T>> {
        let mut signals = Vec::new();
        while let Some(signal) = self.recv().await {
            let last = signal.is_stop() || self.kind.is_value();
            signals.push(signal);
            if last {
                break;
            }
        }
        signals
    }

    /// Signals already queued, without waiting
    pub fn drain_ready(&self) -> Vec<Signal<T>> {
        let mut signals = Vec::new();
        while let Ok(signal) = self.rx.try_recv() {
            signals.push(signal);
        }
        signals
    }
}

/// Creates [`ChannelTarget`]s for operators
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelFactory;

impl<T: Send + 'static> SequenceFactory<T> for ChannelFactory {
    type Target = ChannelTarget<T>;

    fn create(&self, kind: SequenceKind) -> Self::Target {
        ChannelTarget::new(kind)
    }
}
