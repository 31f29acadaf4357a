//! # Channel Engine
//!
//! In-process sequence engine backed by `async-channel` queues and tokio
//! tasks.
//!
//! Responsibilities:
//! - Stream and value sources with a writer handle ([`SourceWriter`])
//! - One delivery task per subscription, events in emission order
//! - Output targets with an async read side ([`Output`])
//! - Joining subscriptions and reporting failures ([`Engine::join`])
//!
//! ## Usage Example
//!
//! ```ignore
//! use channel_engine::{ChannelFactory, Engine};
//!
//! let engine = Engine::new()?;
//! let (writer, source) = engine.stream_source::<i64>("numbers");
//!
//! // build and apply an operator over `source` with `ChannelFactory`
//!
//! writer.next(1)?;
//! writer.complete()?;
//! engine.join().await?;
//! ```

mod engine;
mod error;
mod source;
mod target;

// Re-exports
pub use engine::{Engine, EngineReport, SubscriptionReport, Termination};
pub use error::{EngineError, Result};
pub use source::{ChannelSource, SourceEvent, SourceWriter};
pub use target::{ChannelFactory, ChannelTarget, Output};
