//! Target Index — `env-app` → TargetState, mutated by autoscaler-stream
//! events and matched against whatever keys the Schedule Store currently
//! knows about.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::TargetIndexError;
use crate::schedule::Key;
use crate::target::{derive_key, RawAutoscalerObject, TargetState};

/// An immutable point-in-time view of the target index.
#[derive(Debug, Clone, Default)]
pub struct TargetIndexSnapshot {
    pub targets: Arc<HashMap<Key, TargetState>>,
}

impl TargetIndexSnapshot {
    pub fn get(&self, key: &str) -> Option<&TargetState> {
        self.targets.get(key)
    }
}

#[derive(Debug, Default)]
pub struct TargetIndex {
    targets: HashMap<Key, TargetState>,
}

impl TargetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any non-delete autoscaler event (created or updated) upserts the
    /// entry. The key is derived from the resource name; events that
    /// cannot be derived are discarded with a warning.
    pub fn on_autoscaler_event(
        &mut self,
        obj: RawAutoscalerObject,
    ) -> Result<Key, TargetIndexError> {
        let key = derive_key(&obj.metadata.name)
            .ok_or_else(|| TargetIndexError::UnderivableKey(obj.metadata.name.clone()))?;

        let min_replicas = obj.spec.min_replicas;
        self.targets.insert(
            key.clone(),
            TargetState {
                hpa_name: obj.metadata.name,
                namespace: obj.metadata.namespace,
                observed_min_replicas: min_replicas,
                observed_current_replicas: obj.status.current_replicas,
            },
        );

        debug!(key = %key, min = min_replicas, "target index updated");
        Ok(key)
    }

    /// Remove the entry matching `name`/`namespace`. Looks up by derived
    /// key since that's the index's primary identity.
    pub fn on_autoscaler_deleted(&mut self, name: &str, namespace: &str) {
        match derive_key(name) {
            Some(key) => {
                if let Some(existing) = self.targets.get(&key) {
                    if existing.namespace == namespace {
                        self.targets.remove(&key);
                        debug!(key = %key, "target removed");
                    }
                }
            }
            None => warn!(name, "DELETED event with underivable key, ignoring"),
        }
    }

    pub fn snapshot(&self) -> TargetIndexSnapshot {
        TargetIndexSnapshot {
            targets: Arc::new(self.targets.clone()),
        }
    }
}
