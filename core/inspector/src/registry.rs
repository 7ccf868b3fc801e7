//! Process-wide registry of instrumented stores.
//!
//! Presentation composes against an explicit registry instance rather than
//! ambient module state: whoever builds the inspection surface constructs
//! the registry and passes it along. Engines hold a weak binding back to
//! their registry so `dispose()` can detach without keeping it alive.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use crate::engine::InspectorEngine;

pub type SharedEngine = Arc<Mutex<InspectorEngine>>;
pub type SharedRegistry = Arc<Mutex<InspectorRegistry>>;

#[derive(Clone)]
pub struct RegistryEntry {
    pub id: u64,
    pub name: String,
    pub engine: SharedEngine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryChange {
    Registered { id: u64, name: String },
    Unregistered { id: u64 },
}

pub struct InspectorRegistry {
    next_id: u64,
    entries: BTreeMap<u64, RegistryEntry>,
    subscribers: BTreeMap<u64, Box<dyn Fn(&RegistryChange) + Send>>,
    subscriber_seq: u64,
}

impl InspectorRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
            subscribers: BTreeMap::new(),
            subscriber_seq: 0,
        }
    }

    pub fn register(&mut self, name: impl Into<String>, engine: SharedEngine) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let name = name.into();
        self.entries.insert(
            id,
            RegistryEntry {
                id,
                name: name.clone(),
                engine,
            },
        );
        self.notify(&RegistryChange::Registered { id, name });
        id
    }

    pub fn unregister(&mut self, id: u64) -> bool {
        let removed = self.entries.remove(&id).is_some();
        if removed {
            self.notify(&RegistryChange::Unregistered { id });
        }
        removed
    }

    pub fn get(&self, id: u64) -> Option<RegistryEntry> {
        self.entries.get(&id).cloned()
    }

    /// Registration-ordered snapshot of all instrumented stores.
    pub fn list(&self) -> Vec<RegistryEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn subscribe(&mut self, callback: impl Fn(&RegistryChange) + Send + 'static) -> u64 {
        self.subscriber_seq += 1;
        self.subscribers.insert(self.subscriber_seq, Box::new(callback));
        self.subscriber_seq
    }

    pub fn unsubscribe(&mut self, id: u64) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    fn notify(&self, change: &RegistryChange) {
        for callback in self.subscribers.values() {
            callback(change);
        }
    }
}

impl Default for InspectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak back-reference from an engine to the registry it is listed in.
pub struct RegistryBinding {
    registry: Weak<Mutex<InspectorRegistry>>,
    id: u64,
}

impl RegistryBinding {
    pub fn new(registry: Weak<Mutex<InspectorRegistry>>, id: u64) -> Self {
        Self { registry, id }
    }

    pub(crate) fn detach(self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if let Ok(mut guard) = registry.lock() {
            guard.unregister(self.id);
        };
    }
}

/// Registers an engine under its own label and wires the back-binding so
/// the engine's `dispose()` unregisters it. Returns the registry id, or
/// `None` when a lock is poisoned.
pub fn register_engine(registry: &SharedRegistry, engine: &SharedEngine) -> Option<u64> {
    let name = engine.lock().ok()?.label().to_string();
    let id = registry.lock().ok()?.register(name, Arc::clone(engine));
    if let Ok(mut guard) = engine.lock() {
        guard.bind_registry(RegistryBinding::new(Arc::downgrade(registry), id));
    }
    Some(id)
}
