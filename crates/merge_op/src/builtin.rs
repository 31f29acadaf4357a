//! Built-in handlers for JSON value streams, referenced by name from
//! operator config files.
//!
//! | name                     | event         | behavior                                   |
//! |--------------------------|---------------|--------------------------------------------|
//! | `forward`                | `on_next`     | single output: emit; named outputs: emit to every target |
//! | `double`                 | `on_next`     | multiply a number by two and `forward` it  |
//! | `route_by_source`        | `on_next`     | emit to the target at the source index     |
//! | `done`                   | `on_complete` | close the outputs                          |
//! | `done_when_all_complete` | `on_complete` | close the outputs once every source completed |
//! | `log_error`              | `on_error`    | log the error and keep going               |

use std::sync::atomic::{AtomicUsize, Ordering};

use contracts::MergeError;
use serde_json::Value;
use tracing::warn;

use crate::dsl::Dsl;
use crate::registry::HandlerRegistry;

/// Registry holding every built-in handler
///
/// `source_count` is the number of sources of the operator the handlers
/// will serve; `done_when_all_complete` counts completions against it.
pub fn builtin_registry(source_count: usize) -> HandlerRegistry<Value> {
    let mut registry = HandlerRegistry::new();
    let completed = AtomicUsize::new(0);

    registry
        .register_next("forward", |dsl, value, _| forward(dsl, value))
        .register_next("double", |dsl, value, _| forward(dsl, double(value)?))
        .register_next("route_by_source", route_by_source)
        .register_complete("done", |dsl, _| dsl.done())
        .register_complete("done_when_all_complete", move |dsl, _| {
            let seen = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if seen >= source_count {
                dsl.done()?;
            }
            Ok(())
        })
        .register_error("log_error", |_, error, index| {
            warn!(source = ?index, error = %error, "source error ignored");
            Ok(())
        });
    registry
}

fn forward(dsl: &Dsl<Value>, value: Value) -> Result<(), MergeError> {
    match dsl.as_multi() {
        None => dsl.emit(value),
        Some(multi) => {
            for name in dsl.names() {
                multi.emit(name, value.clone())?;
            }
            Ok(())
        }
    }
}

fn double(value: Value) -> Result<Value, MergeError> {
    if let Some(n) = value.as_i64() {
        if let Some(doubled) = n.checked_mul(2) {
            return Ok(Value::from(doubled));
        }
    }
    match value.as_f64() {
        Some(n) => Ok(Value::from(n * 2.0)),
        None => Err(MergeError::callback(format!(
            "double expects a number, got {value}"
        ))),
    }
}

fn route_by_source(dsl: &Dsl<Value>, value: Value, index: Option<usize>) -> Result<(), MergeError> {
    let index = index.unwrap_or(0);
    let name = dsl
        .names()
        .nth(index)
        .ok_or_else(|| MergeError::usage(format!("no output declared for source {index}")))?;
    dsl.emit_to(name, value)
}
