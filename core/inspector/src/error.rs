//! Error types for the inspector's ambient edges.
//!
//! Correlation itself never fails outward: a crash in instrumentation must
//! not crash the instrumented store. Typed errors exist only where plumbing
//! can legitimately fail (snapshot capture, channel forwarding), and the
//! engine recovers from or swallows both.

use thiserror::Error;

/// Failure to deliver a record to an external message channel.
///
/// The engine logs these at debug level and drops them; forwarding is
/// best-effort by contract.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("message channel is closed")]
    Closed,

    #[error("message channel rejected the record: {0}")]
    Rejected(String),
}

/// Failure inside the snapshot-capture fallback chain.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("JSON round trip failed: {0}")]
    Json(#[from] serde_json::Error),
}
