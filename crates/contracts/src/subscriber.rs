//! Subscriber - handler set registered on a source
//!
//! A callback returning `Err` is fatal to its subscription: the engine stops
//! delivering events for it and reports the failure.

use crate::{MergeError, SourceError};

/// "Next value" callback
pub type NextCallback<T> = Box<dyn FnMut(T) -> Result<(), MergeError> + Send>;

/// Completion callback
pub type CompleteCallback = Box<dyn FnMut() -> Result<(), MergeError> + Send>;

/// Error callback
pub type ErrorCallback = Box<dyn FnMut(SourceError) -> Result<(), MergeError> + Send>;

/// Handler set for one subscription
pub struct Subscriber<T> {
    pub on_next: NextCallback<T>,
    pub on_complete: CompleteCallback,
    /// `None` leaves source errors to the engine's default failure propagation
    pub on_error: Option<ErrorCallback>,
}

impl<T> Subscriber<T> {
    pub fn new(
        on_next: impl FnMut(T) -> Result<(), MergeError> + Send + 'static,
        on_complete: impl FnMut() -> Result<(), MergeError> + Send + 'static,
    ) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_complete: Box::new(on_complete),
            on_error: None,
        }
    }

    pub fn with_error_handler(
        mut self,
        on_error: impl FnMut(SourceError) -> Result<(), MergeError> + Send + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }
}

impl<T> std::fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}
