//! Store policy configuration.

use serde::{Deserialize, Serialize};

/// Policy knobs for a [`PlaygroundStore`](crate::PlaygroundStore).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Upper bound on instances; `add_instance` is ignored once reached (default: 2)
    pub max_instances: usize,
    /// Refuse to delete the only remaining instance (default: true)
    pub keep_last_instance: bool,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            max_instances: 2,
            keep_last_instance: true,
        }
    }
}

impl PlaygroundConfig {
    pub fn with_max_instances(mut self, max_instances: usize) -> Self {
        self.max_instances = max_instances;
        self
    }

    pub fn with_keep_last_instance(mut self, keep: bool) -> Self {
        self.keep_last_instance = keep;
        self
    }
}
