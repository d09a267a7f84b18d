//! Sample methods served by the bundled binary
//!
//! Small arithmetic and diagnostic calls that exercise positional, named and
//! variadic parameters end to end.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{MethodError, RegistryError};
use crate::rpc::MethodRegistry;

#[derive(Debug, Deserialize)]
struct SubtractParams {
    minuend: i64,
    subtrahend: i64,
}

pub fn build_registry() -> Result<MethodRegistry, RegistryError> {
    MethodRegistry::new()
        .register("ping", 0, |_| Ok(json!("pong")))?
        .register("echo", 1, |params| Ok(Value::Array(params)))?
        .register_typed("add", 2, |(left, right): (i64, i64)| checked_add(left, right))?
        .register_typed("sum", 0, |values: Vec<i64>| {
            values.into_iter().try_fold(0, checked_add)
        })?
        .register("subtract", 1, subtract)?
        .register("fail", 0, |params| {
            let message = params
                .first()
                .and_then(Value::as_str)
                .unwrap_or("requested failure");
            Err(MethodError::failed(message))
        })
}

fn checked_add(left: i64, right: i64) -> Result<i64, MethodError> {
    left.checked_add(right)
        .ok_or_else(|| MethodError::failed("integer overflow"))
}

/// Accepts `[minuend, subtrahend]` or `{"minuend": .., "subtrahend": ..}`.
fn subtract(params: Vec<Value>) -> Result<Value, MethodError> {
    let SubtractParams {
        minuend,
        subtrahend,
    } = match params.as_slice() {
        [named @ Value::Object(_)] => serde_json::from_value(named.clone())?,
        [minuend, subtrahend, ..] => SubtractParams {
            minuend: serde_json::from_value(minuend.clone())?,
            subtrahend: serde_json::from_value(subtrahend.clone())?,
        },
        _ => return Err(MethodError::invalid_params("Too few parameters passed.")),
    };

    minuend
        .checked_sub(subtrahend)
        .map(Value::from)
        .ok_or_else(|| MethodError::failed("integer overflow"))
}
