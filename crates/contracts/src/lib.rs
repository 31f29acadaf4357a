//! # Contracts
//!
//! Frozen interface contracts between the merge operator and the engine that
//! hosts it. All business crates depend on this crate, reverse dependencies
//! are prohibited.
//!
//! ## Sequence model
//! - Sources are read-only sequences owned and scheduled by the engine
//! - Targets are write-only sequences created by the operator through a
//!   [`SequenceFactory`] and read downstream as [`Signal`]s
//! - A sequence is either a stream or a single-resolution value

mod decl;
mod error;
mod names;
mod sequence;
mod subscriber;

pub use decl::*;
pub use error::*;
pub use names::*;
pub use sequence::*;
pub use subscriber::*;
