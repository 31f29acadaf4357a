//! In-memory engine doubles for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{
    ContractError, MergeError, SequenceFactory, SequenceKind, Signal, SourceError,
    SourceSequence, Subscriber, TargetSequence,
};

/// Target that records every signal it receives
#[derive(Clone, Debug)]
pub struct RecordingTarget<T> {
    kind: SequenceKind,
    log: Arc<Mutex<Vec<Signal<T>>>>,
    refuse_stop: Arc<AtomicBool>,
}

impl<T: Clone> RecordingTarget<T> {
    pub fn new(kind: SequenceKind) -> Self {
        Self {
            kind,
            log: Arc::new(Mutex::new(Vec::new())),
            refuse_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every later `stop()` fail as if the engine had closed the target
    pub fn refuse_stop(&self) {
        self.refuse_stop.store(true, Ordering::SeqCst);
    }

    pub fn signals(&self) -> Vec<Signal<T>> {
        self.log.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.log.lock().unwrap().iter().filter(|s| s.is_stop()).count()
    }
}

impl<T: Send> TargetSequence<T> for RecordingTarget<T> {
    fn kind(&self) -> SequenceKind {
        self.kind
    }

    fn bind(&self, value: T) -> Result<(), ContractError> {
        let mut log = self.log.lock().unwrap();
        if self.kind.is_value() && !log.is_empty() {
            return Err(ContractError::TargetAlreadyResolved);
        }
        log.push(Signal::Item(value));
        Ok(())
    }

    fn stop(&self) -> Result<(), ContractError> {
        if self.refuse_stop.load(Ordering::SeqCst) {
            return Err(ContractError::TargetClosed);
        }
        self.log.lock().unwrap().push(Signal::Stop);
        Ok(())
    }
}

pub struct RecordingFactory;

impl<T: Clone + Send + 'static> SequenceFactory<T> for RecordingFactory {
    type Target = RecordingTarget<T>;

    fn create(&self, kind: SequenceKind) -> Self::Target {
        RecordingTarget::new(kind)
    }
}

/// Source driven by the test, synchronously on the calling thread
pub struct ManualSource<T> {
    kind: SequenceKind,
    subscribers: Mutex<Vec<Subscriber<T>>>,
    reject: bool,
}

impl<T: Clone + Send> ManualSource<T> {
    pub fn stream() -> Arc<Self> {
        Arc::new(Self {
            kind: SequenceKind::Stream,
            subscribers: Mutex::new(Vec::new()),
            reject: false,
        })
    }

    /// Stream source whose `subscribe` always fails
    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            kind: SequenceKind::Stream,
            subscribers: Mutex::new(Vec::new()),
            reject: true,
        })
    }

    pub fn value() -> Arc<Self> {
        Arc::new(Self {
            kind: SequenceKind::Value,
            subscribers: Mutex::new(Vec::new()),
            reject: false,
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    pub fn next(&self, value: T) -> Result<(), MergeError> {
        for subscriber in self.subscribers.lock().unwrap().iter_mut() {
            (subscriber.on_next)(value.clone())?;
        }
        Ok(())
    }

    pub fn complete(&self) -> Result<(), MergeError> {
        for subscriber in self.subscribers.lock().unwrap().iter_mut() {
            (subscriber.on_complete)()?;
        }
        Ok(())
    }

    /// Deliver an error; `Ok(false)` when a subscriber has no error handler
    pub fn error(&self, error: SourceError) -> Result<bool, MergeError> {
        let mut handled = true;
        for subscriber in self.subscribers.lock().unwrap().iter_mut() {
            match subscriber.on_error.as_mut() {
                Some(on_error) => on_error(error.clone())?,
                None => handled = false,
            }
        }
        Ok(handled)
    }
}

impl<T: Send> SourceSequence<T> for ManualSource<T> {
    fn kind(&self) -> SequenceKind {
        self.kind
    }

    fn subscribe(&self, subscriber: Subscriber<T>) -> Result<(), ContractError> {
        if self.reject {
            return Err(ContractError::subscription_failed("source refused subscriber"));
        }
        self.subscribers.lock().unwrap().push(subscriber);
        Ok(())
    }
}
