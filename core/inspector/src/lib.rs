//! # hurum-inspector
//!
//! Event correlation and diff engine for inspecting Hurum stores: observes
//! a stream of lifecycle callbacks (intent start/end, dispatched events,
//! state transitions, errors) and reconstructs a causally correlated,
//! bounded history suitable for visual inspection.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. The host store invokes
//!   callbacks on one logical thread of control; hosts that need sharing
//!   wrap the engine in their own `Mutex`.
//! - **Never throws back**: A crash in instrumentation must not crash the
//!   instrumented store. Capture failures fall back, forwarding failures
//!   are swallowed, unknown intent ends are no-ops.
//! - **Snapshots out, never references in**: Payloads are cloned JSON-like
//!   values; read APIs materialize fresh snapshots that consumers may keep.
//! - **Explicit lifecycles**: Intent correlation is keyed by clonable
//!   tokens dropped on intent-end, and the registry is an explicit object
//!   passed to whoever composes the inspection surface.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hurum_inspector::{InspectorConfig, InspectorEngine};
//! use hurum_inspector_protocol::IntentHandle;
//!
//! let mut engine = InspectorEngine::new(InspectorConfig::named("Cart"));
//! let intent = IntentHandle::new(vec![]);
//! engine.on_intent_start(&intent, &serde_json::json!({"sku": 7}));
//! engine.on_event(&serde_json::json!({"type": "cart/add"}), &state);
//! engine.on_intent_end(&intent.token);
//! let entries = engine.entries();
//! ```

pub mod capture;
pub mod channel;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod history;
pub mod paths;
pub mod registry;

pub use channel::MessageChannel;
pub use config::{InspectorConfig, DEFAULT_MAX_HISTORY, DEFAULT_STORE_NAME};
pub use diff::{diff, structural_eq, ChangeRecord, DIFF_DEPTH_LIMIT};
pub use engine::{InspectorEngine, SubscriptionId};
pub use error::{CaptureError, ChannelError};
pub use history::BoundedHistory;
pub use paths::{changed_paths, TRACK_DEPTH_LIMIT};
pub use registry::{
    register_engine, InspectorRegistry, RegistryChange, RegistryEntry, SharedEngine,
    SharedRegistry,
};

// Re-export the shared record types so most hosts depend on one crate.
pub use hurum_inspector_protocol as protocol;
pub use hurum_inspector_protocol::{
    ErrorDetails, IntentHandle, IntentStep, IntentToken, NestedStoreKind, Occurrence,
    OccurrenceKind, StoreDescriptor, Transaction,
};
