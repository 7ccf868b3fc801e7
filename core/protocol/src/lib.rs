//! Record types shared by the Hurum inspector engine and its viewers.
//!
//! This crate is shared by the in-process engine and any out-of-process
//! inspection surface to prevent schema drift. The engine remains the
//! authority on how records are produced, but viewers reuse the same types
//! to decode forwarded messages.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use ulid::Ulid;

pub const PROTOCOL_VERSION: u32 = 1;

/// Fixed source identifier stamped on every forwarded message.
pub const CHANNEL_SOURCE: &str = "hurum-inspector";

/// Fixed message type for forwarded occurrence records.
pub const CHANNEL_MESSAGE_TYPE: &str = "occurrence";

/// Correlation token stamped onto an intent when it starts.
///
/// The engine keys its in-flight intent index by this token and drops the
/// entry when the intent ends, so the index stays bounded by the number of
/// currently open intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentToken(Ulid);

impl IntentToken {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for IntentToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IntentToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One declared step of an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IntentStep {
    /// A step that produces a named store event.
    Command { event_type: String },
    /// A plain function step with an optional display name.
    Task { name: Option<String> },
}

/// Handle describing one intent invocation at start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentHandle {
    pub token: IntentToken,
    #[serde(default)]
    pub steps: Vec<IntentStep>,
}

impl IntentHandle {
    pub fn new(steps: Vec<IntentStep>) -> Self {
        Self {
            token: IntentToken::new(),
            steps,
        }
    }

    /// Human-readable command names derived from the declared steps.
    /// Steps that yield no string are omitted.
    pub fn command_names(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                IntentStep::Command { event_type } => Some(event_type.clone()),
                IntentStep::Task { name } => name.clone(),
            })
            .collect()
    }
}

/// How a sub-store is embedded in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestedStoreKind {
    Single,
    Array,
    Map,
}

/// Descriptive store metadata captured once at attach time.
///
/// Consumed by presentation only; correlation never reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDescriptor {
    #[serde(default)]
    pub computed_keys: Vec<String>,
    #[serde(default)]
    pub nested_keys: BTreeMap<String, NestedStoreKind>,
}

/// An application error observed by the store, recorded as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(message: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Some(stack.into()),
        }
    }
}

/// Kind-specific payload of an occurrence.
///
/// Payload values are opaque cloned snapshots; no schema beyond "JSON-like"
/// is assumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OccurrenceKind {
    IntentStart {
        commands: Vec<String>,
        payload: Value,
    },
    IntentEnd {},
    Event {
        event: Value,
        state: Value,
    },
    StateChange {
        prev: Value,
        next: Value,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<Value>,
    },
}

/// One observed lifecycle callback. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Strictly increasing per engine instance, never reused.
    pub id: u64,
    /// Milliseconds on the engine's monotonic clock; relative durations only.
    pub timestamp_ms: u64,
    /// The enclosing transaction, if any. A reference, not ownership.
    #[serde(default)]
    pub transaction_id: Option<u64>,
    #[serde(flatten)]
    pub kind: OccurrenceKind,
}

/// One intent's lifetime: created at intent-start, mutated in place until
/// intent-end, deleted only by a full-history clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub start_occurrence_id: u64,
    #[serde(default)]
    pub end_occurrence_id: Option<u64>,
    /// Occurrence ids recorded while this transaction was top of the active
    /// stack, insertion order. Never contains the start occurrence.
    #[serde(default)]
    pub child_occurrence_ids: Vec<u64>,
    /// Monotone: set true by an observed error, never reset.
    #[serde(default)]
    pub has_error: bool,
    pub started_at_ms: u64,
    #[serde(default)]
    pub ended_at_ms: Option<u64>,
}

impl Transaction {
    pub fn is_running(&self) -> bool {
        self.end_occurrence_id.is_none()
    }
}

/// Envelope forwarded to an external message channel for each occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub source: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub protocol_version: u32,
    /// Display label of the originating store.
    pub store: String,
    /// Wall-clock RFC3339 stamp for out-of-process display.
    pub recorded_at: String,
    pub occurrence: Occurrence,
}

impl ChannelMessage {
    pub fn for_occurrence(store: impl Into<String>, occurrence: Occurrence) -> Self {
        Self {
            source: CHANNEL_SOURCE.to_string(),
            message_type: CHANNEL_MESSAGE_TYPE.to_string(),
            protocol_version: PROTOCOL_VERSION,
            store: store.into(),
            recorded_at: Utc::now().to_rfc3339(),
            occurrence,
        }
    }
}
