//! Correlation engine: turns store lifecycle callbacks into a bounded,
//! causally attributed history.
//!
//! The engine is synchronous and callback-driven; the host store invokes one
//! callback at a time on a single logical thread of control. Every callback
//! is fire-and-forget: correlation never panics back into the host and
//! plumbing failures (capture, forwarding) are recovered or swallowed.
//!
//! Causal attribution: an occurrence belongs to whichever intent most
//! recently started and has not yet ended, i.e. the top of the active
//! stack. Nested intents form a true stack, and intents may close out of
//! order (an outer intent can end after an inner one), so removal on
//! intent-end targets the matching id wherever it sits.
//!
//! State transitions are coalesced: synchronous `on_state_change` calls
//! within one logical batch collapse into a single pending record keeping
//! the first `prev` and the latest `next`. The host calls `flush()` once per
//! batch, after its synchronous work, to materialize the record. `clear()`
//! abandons a pending record without flushing it.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use hurum_inspector_protocol::{
    ChannelMessage, ErrorDetails, IntentHandle, IntentToken, NestedStoreKind, Occurrence,
    OccurrenceKind, StoreDescriptor, Transaction,
};

use crate::capture;
use crate::channel::MessageChannel;
use crate::config::InspectorConfig;
use crate::history::BoundedHistory;
use crate::registry::RegistryBinding;

pub type SubscriptionId = u64;

struct PendingStateChange {
    prev: Value,
    next: Value,
    /// Transaction current at the first call of the batch.
    transaction_id: Option<u64>,
}

pub struct InspectorEngine {
    label: String,
    enabled: bool,
    epoch: Instant,
    occurrence_seq: u64,
    transaction_seq: u64,
    history: BoundedHistory<Arc<Occurrence>>,
    transactions: BTreeMap<u64, Transaction>,
    active_stack: Vec<u64>,
    intent_index: HashMap<IntentToken, u64>,
    pending: Option<PendingStateChange>,
    latest_state: Option<Value>,
    computed_keys: Vec<String>,
    nested_keys: BTreeMap<String, NestedStoreKind>,
    subscribers: BTreeMap<SubscriptionId, Box<dyn Fn() + Send>>,
    subscriber_seq: SubscriptionId,
    channel: Option<Box<dyn MessageChannel>>,
    binding: Option<RegistryBinding>,
}

impl InspectorEngine {
    pub fn new(config: InspectorConfig) -> Self {
        let enabled = config.is_active(!cfg!(debug_assertions));
        Self {
            label: config.name,
            enabled,
            epoch: Instant::now(),
            occurrence_seq: 0,
            transaction_seq: 0,
            history: BoundedHistory::new(config.max_history),
            transactions: BTreeMap::new(),
            active_stack: Vec::new(),
            intent_index: HashMap::new(),
            pending: None,
            latest_state: None,
            computed_keys: Vec::new(),
            nested_keys: BTreeMap::new(),
            subscribers: BTreeMap::new(),
            subscriber_seq: 0,
            channel: None,
            binding: None,
        }
    }

    /// Installs the external message channel occurrences are forwarded to.
    pub fn set_channel(&mut self, channel: Box<dyn MessageChannel>) {
        self.channel = Some(channel);
    }

    pub(crate) fn bind_registry(&mut self, binding: RegistryBinding) {
        self.binding = Some(binding);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ─────────────────────────────────────────────────────────────────────
    // Host-facing lifecycle callbacks
    // ─────────────────────────────────────────────────────────────────────

    /// One-time capture of descriptive store metadata. Correlation never
    /// reads it; presentation does.
    pub fn on_attach(&mut self, descriptor: &StoreDescriptor) {
        if !self.enabled {
            return;
        }
        self.computed_keys = descriptor.computed_keys.clone();
        self.nested_keys = descriptor.nested_keys.clone();
    }

    pub fn on_intent_start<P: Serialize + ?Sized>(&mut self, intent: &IntentHandle, payload: &P) {
        if !self.enabled {
            return;
        }
        self.transaction_seq += 1;
        let transaction_id = self.transaction_seq;
        self.intent_index.insert(intent.token, transaction_id);
        self.active_stack.push(transaction_id);

        let occurrence = self.record(
            Some(transaction_id),
            OccurrenceKind::IntentStart {
                commands: intent.command_names(),
                payload: capture::snapshot(payload),
            },
        );
        self.transactions.insert(
            transaction_id,
            Transaction {
                id: transaction_id,
                start_occurrence_id: occurrence.id,
                end_occurrence_id: None,
                child_occurrence_ids: Vec::new(),
                has_error: false,
                started_at_ms: occurrence.timestamp_ms,
                ended_at_ms: None,
            },
        );
        self.notify();
        self.forward(&occurrence);
    }

    pub fn on_event<E: Serialize + ?Sized, S: Serialize + ?Sized>(&mut self, event: &E, state: &S) {
        if !self.enabled {
            return;
        }
        let state_snapshot = capture::snapshot(state);
        self.latest_state = Some(state_snapshot.clone());

        let current = self.current_transaction();
        let occurrence = self.record(
            current,
            OccurrenceKind::Event {
                event: capture::snapshot(event),
                state: state_snapshot,
            },
        );
        if let Some(transaction_id) = current {
            self.push_child(transaction_id, occurrence.id);
        }
        self.notify();
        self.forward(&occurrence);
    }

    /// Records a state transition into the single-slot coalesce buffer.
    /// Repeated synchronous calls keep the original `prev` and overwrite
    /// `next`, so one batch nets out to at most one occurrence on `flush()`.
    pub fn on_state_change<S: Serialize + ?Sized>(&mut self, prev: &S, next: &S) {
        if !self.enabled {
            return;
        }
        let next_snapshot = capture::snapshot(next);
        self.latest_state = Some(next_snapshot.clone());

        if let Some(pending) = self.pending.as_mut() {
            pending.next = next_snapshot;
            return;
        }
        self.pending = Some(PendingStateChange {
            prev: capture::snapshot(prev),
            next: next_snapshot,
            transaction_id: self.current_transaction(),
        });
    }

    /// Materializes the pending coalesced state change, if any. The host
    /// calls this once per logical batch, after all synchronous callbacks
    /// of the batch have run.
    pub fn flush(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let occurrence = self.record(
            pending.transaction_id,
            OccurrenceKind::StateChange {
                prev: pending.prev,
                next: pending.next,
            },
        );
        if let Some(transaction_id) = pending.transaction_id {
            self.push_child(transaction_id, occurrence.id);
        }
        self.notify();
        self.forward(&occurrence);
    }

    /// Ending an intent that was never started (or already ended, or started
    /// before a `clear()`) is a silent no-op.
    pub fn on_intent_end(&mut self, token: &IntentToken) {
        if !self.enabled {
            return;
        }
        let Some(transaction_id) = self.intent_index.remove(token) else {
            return;
        };
        // Out-of-order close: remove the matching id wherever it sits,
        // targeting its last occurrence.
        if let Some(position) = self.active_stack.iter().rposition(|id| *id == transaction_id) {
            self.active_stack.remove(position);
        }

        let occurrence = self.record(Some(transaction_id), OccurrenceKind::IntentEnd {});
        if let Some(transaction) = self.transactions.get_mut(&transaction_id) {
            if transaction.end_occurrence_id.is_none() {
                transaction.end_occurrence_id = Some(occurrence.id);
                transaction.ended_at_ms = Some(occurrence.timestamp_ms);
            }
        }
        self.notify();
        self.forward(&occurrence);
    }

    /// An observed application error is data, not an engine fault.
    pub fn on_error(&mut self, error: &ErrorDetails, context: Option<&Value>) {
        if !self.enabled {
            return;
        }
        let current = self.current_transaction();
        let occurrence = self.record(
            current,
            OccurrenceKind::Error {
                message: error.message.clone(),
                stack: error.stack.clone(),
                context: context.cloned(),
            },
        );
        if let Some(transaction_id) = current {
            self.push_child(transaction_id, occurrence.id);
            if let Some(transaction) = self.transactions.get_mut(&transaction_id) {
                transaction.has_error = true;
            }
        }
        self.notify();
        self.forward(&occurrence);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Presentation-facing snapshot reads
    // ─────────────────────────────────────────────────────────────────────

    /// Oldest-first snapshot of retained occurrences, freshly materialized.
    pub fn entries(&self) -> Vec<Arc<Occurrence>> {
        self.history.to_vec()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.values().cloned().collect()
    }

    pub fn current_state(&self) -> Option<Value> {
        self.latest_state.clone()
    }

    pub fn computed_keys(&self) -> &[String] {
        &self.computed_keys
    }

    pub fn nested_keys(&self) -> &BTreeMap<String, NestedStoreKind> {
        &self.nested_keys
    }

    /// Registers a change callback, invoked synchronously after every
    /// mutating operation. Callbacks receive no engine reference and must
    /// not assume they can re-enter.
    pub fn subscribe(&mut self, callback: impl Fn() + Send + 'static) -> SubscriptionId {
        self.subscriber_seq += 1;
        self.subscribers.insert(self.subscriber_seq, Box::new(callback));
        self.subscriber_seq
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Empties history, transactions, the active stack, and the intent
    /// index, and abandons any pending coalesce record without flushing.
    /// Id counters are not reset: ids stay unique across clears.
    pub fn clear(&mut self) {
        self.history.clear();
        self.transactions.clear();
        self.active_stack.clear();
        self.intent_index.clear();
        self.pending = None;
        self.notify();
    }

    /// Detaches the engine from its registry. History is untouched.
    pub fn dispose(&mut self) {
        if let Some(binding) = self.binding.take() {
            binding.detach();
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn current_transaction(&self) -> Option<u64> {
        self.active_stack.last().copied()
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn record(&mut self, transaction_id: Option<u64>, kind: OccurrenceKind) -> Arc<Occurrence> {
        self.occurrence_seq += 1;
        let occurrence = Arc::new(Occurrence {
            id: self.occurrence_seq,
            timestamp_ms: self.now_ms(),
            transaction_id,
            kind,
        });
        self.history.push(Arc::clone(&occurrence));
        occurrence
    }

    fn push_child(&mut self, transaction_id: u64, occurrence_id: u64) {
        if let Some(transaction) = self.transactions.get_mut(&transaction_id) {
            transaction.child_occurrence_ids.push(occurrence_id);
        }
    }

    fn notify(&self) {
        for callback in self.subscribers.values() {
            callback();
        }
    }

    fn forward(&self, occurrence: &Occurrence) {
        let Some(channel) = self.channel.as_ref() else {
            return;
        };
        let message = ChannelMessage::for_occurrence(self.label.clone(), occurrence.clone());
        if let Err(err) = channel.send(message) {
            tracing::debug!(error = %err, "Failed to forward occurrence to message channel");
        }
    }
}
