//! Best-effort snapshotting of host payloads into JSON-like values.
//!
//! Payloads are opaque to the engine; capture must never fail outward. The
//! fallback chain is: direct conversion, then a serialize/deserialize round
//! trip, then a null sentinel. The source's final raw-reference fallback is
//! not expressible for owned snapshots, so the sentinel stands in for it and
//! the failure is logged at debug level.

use serde::Serialize;
use serde_json::Value;

use crate::error::CaptureError;

/// Captures a cloned JSON snapshot of `value`. Never fails.
pub fn snapshot<T: Serialize + ?Sized>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(snapshot) => snapshot,
        Err(err) => match round_trip(value) {
            Ok(snapshot) => snapshot,
            Err(fallback_err) => {
                tracing::debug!(
                    error = %err,
                    fallback_error = %fallback_err,
                    "Snapshot capture failed, recording null sentinel"
                );
                Value::Null
            }
        },
    }
}

fn round_trip<T: Serialize + ?Sized>(value: &T) -> Result<Value, CaptureError> {
    let text = serde_json::to_string(value)?;
    Ok(serde_json::from_str(&text)?)
}
