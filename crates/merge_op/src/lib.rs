//! # Merge Operator
//!
//! Multi-source event merge operator.
//!
//! Responsible for:
//! - subscribing user callbacks to one or more source sequences
//! - serializing multi-source callbacks with a [`SynchronizationGuard`]
//! - routing emitted values into one implicit or several named targets
//! - closing targets through [`Dsl::done`]
//!
//! ## Example
//!
//! ```ignore
//! use merge_op::{MergeOperator, MergeOptions};
//!
//! let options = MergeOptions::new().on_next(|dsl, v: i64, _| dsl.emit(v * 2));
//! let op = MergeOperator::new(vec![source], options, &factory)?;
//! op.apply()?;
//!
//! let doubled = op.output()?;
//! ```

mod builtin;
mod dsl;
mod guard;
mod handlers;
mod operator;
mod registry;

#[cfg(test)]
mod test_support;

// Re-exports
pub use builtin::builtin_registry;
pub use dsl::{Dsl, EmitMode, MultiOutput, SingleOutput};
pub use guard::SynchronizationGuard;
pub use handlers::{
    CompleteHandler, ErrorHandler, HandlerOption, HandlerSet, MergeOptions, NextHandler,
};
pub use operator::MergeOperator;
pub use registry::{HandlerRegistry, NamedHandler};
