//! Inspector configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_HISTORY: usize = 200;
pub const DEFAULT_STORE_NAME: &str = "Hurum Store";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Capacity of the bounded history buffer.
    pub max_history: usize,
    /// Display label for the instrumented store.
    pub name: String,
    /// Bypass the inert-in-release gating.
    pub force: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            name: DEFAULT_STORE_NAME.to_string(),
            force: false,
        }
    }
}

impl InspectorConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether an engine with this config records anything. Inspectors are
    /// inert in release builds unless forced.
    pub fn is_active(&self, release_build: bool) -> bool {
        self.force || !release_build
    }
}
