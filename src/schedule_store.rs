//! Schedule Store — the authoritative `env-app` → AppSchedule mapping.
//!
//! Owned exclusively by the reconciler task; mutated only by schedule
//! stream events. `snapshot()` hands the Decision Engine a structurally
//! immutable, cheaply-cloned view so it never observes a partially
//! updated world.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ScheduleStoreError;
use crate::schedule::{AppSchedule, Key, ValidatedDeclaration};

/// An immutable point-in-time view of the schedule store, cheap to clone
/// because the AppSchedule values are reference-counted.
#[derive(Debug, Clone, Default)]
pub struct ScheduleStoreSnapshot {
    pub apps: Arc<HashMap<Key, Arc<AppSchedule>>>,
}

impl ScheduleStoreSnapshot {
    pub fn get(&self, key: &str) -> Option<&Arc<AppSchedule>> {
        self.apps.get(key)
    }
}

#[derive(Debug, Default)]
pub struct ScheduleStore {
    /// Current state: key -> (owning declaration name, schedule).
    entries: HashMap<Key, (String, Arc<AppSchedule>)>,
    /// Declaration name -> keys it currently owns, for `DELETED`/`MODIFIED`.
    by_decl: HashMap<String, Vec<Key>>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `ADDED`: the entire declaration is rejected atomically if any key
    /// collides with a *different* declaration's keys.
    pub fn apply_added(
        &mut self,
        decl: ValidatedDeclaration,
    ) -> Result<(), ScheduleStoreError> {
        for (key, _) in &decl.apps {
            if let Some((owner, _)) = self.entries.get(key) {
                if owner != &decl.decl_name {
                    warn!(
                        decl_name = %decl.decl_name,
                        key = %key,
                        owner = %owner,
                        "rejecting ADDED declaration: key collision"
                    );
                    return Err(ScheduleStoreError::KeyCollision {
                        decl_name: decl.decl_name.clone(),
                        key: key.clone(),
                        owner: owner.clone(),
                    });
                }
            }
        }

        let mut keys = Vec::with_capacity(decl.apps.len());
        for (key, schedule) in decl.apps {
            debug!(decl_name = %decl.decl_name, key = %key, "inserting schedule");
            self.entries
                .insert(key.clone(), (decl.decl_name.clone(), Arc::new(schedule)));
            keys.push(key);
        }
        self.by_decl.insert(decl.decl_name, keys);
        Ok(())
    }

    /// `MODIFIED`: replace the key set owned by `decl_name` unconditionally.
    /// Keys added here are trusted even if they collide with another
    /// declaration's keys — unlike `ADDED`, `MODIFIED` is not deduplicated
    /// against other declarations' keys.
    pub fn apply_modified(&mut self, decl: ValidatedDeclaration) -> Result<(), ScheduleStoreError> {
        if let Some(old_keys) = self.by_decl.remove(&decl.decl_name) {
            for key in old_keys {
                self.entries.remove(&key);
            }
        }

        let mut keys = Vec::with_capacity(decl.apps.len());
        for (key, schedule) in decl.apps {
            self.entries
                .insert(key.clone(), (decl.decl_name.clone(), Arc::new(schedule)));
            keys.push(key);
        }
        self.by_decl.insert(decl.decl_name, keys);
        Ok(())
    }

    /// `DELETED`: drop all keys recorded for `decl_name`.
    pub fn apply_deleted(&mut self, decl_name: &str) {
        if let Some(keys) = self.by_decl.remove(decl_name) {
            for key in keys {
                self.entries.remove(&key);
            }
        } else {
            debug!(decl_name, "DELETED for unknown declaration, ignoring");
        }
    }

    /// An immutable snapshot for the Decision Engine.
    pub fn snapshot(&self) -> ScheduleStoreSnapshot {
        let apps = self
            .entries
            .iter()
            .map(|(k, (_, v))| (k.clone(), v.clone()))
            .collect();
        ScheduleStoreSnapshot {
            apps: Arc::new(apps),
        }
    }

    #[cfg(test)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{validate_declaration, RawAppEntry, RawLabels, RawMetadata, RawSchedule, RawScheduleDeclaration, RawTotalDuration};

    fn decl(name: &str, env: &str, apps: &[&str]) -> ValidatedDeclaration {
        let raw = RawScheduleDeclaration {
            metadata: RawMetadata {
                name: name.to_string(),
                labels: RawLabels {
                    env: Some(env.to_string()),
                },
            },
            spec: apps
                .iter()
                .map(|app| RawAppEntry {
                    name: app.to_string(),
                    default_min_replicas: 2,
                    schedules: vec![RawSchedule {
                        start: "09:00".to_string(),
                        scale_type: "custom".to_string(),
                        total_duration: RawTotalDuration { hours: 1, minutes: 0 },
                        target_min_replicas: 5,
                        days: vec!["weekday".to_string()],
                    }],
                })
                .collect(),
        };
        validate_declaration(raw).unwrap()
    }

    #[test]
    fn duplicate_on_add_is_rejected_atomically() {
        let mut store = ScheduleStore::new();
        store.apply_added(decl("decl-x", "prod", &["api"])).unwrap();

        let err = store
            .apply_added(decl("decl-y", "prod", &["api", "worker"]))
            .unwrap_err();
        assert!(matches!(err, ScheduleStoreError::KeyCollision { .. }));
        // Neither key from decl-y was added — not even "worker".
        assert!(!store.contains_key("prod-worker"));

        // After deleting decl-x, decl-y succeeds.
        store.apply_deleted("decl-x");
        store
            .apply_added(decl("decl-y", "prod", &["api", "worker"]))
            .unwrap();
        assert!(store.contains_key("prod-worker"));
        assert!(store.contains_key("prod-api"));
    }

    #[test]
    fn modified_replaces_own_keys_unconditionally() {
        let mut store = ScheduleStore::new();
        store.apply_added(decl("decl-a", "prod", &["api", "worker"])).unwrap();
        store.apply_modified(decl("decl-a", "prod", &["api"])).unwrap();
        assert!(store.contains_key("prod-api"));
        assert!(!store.contains_key("prod-worker"));
    }

    #[test]
    fn store_unchanged_after_validation_failure() {
        let mut store = ScheduleStore::new();
        store.apply_added(decl("decl-a", "prod", &["api"])).unwrap();
        let before = store.snapshot();

        let raw = RawScheduleDeclaration {
            metadata: RawMetadata {
                name: "decl-bad".to_string(),
                labels: RawLabels { env: None },
            },
            spec: vec![],
        };
        assert!(crate::schedule::validate_declaration(raw).is_err());

        let after = store.snapshot();
        assert_eq!(before.apps.len(), after.apps.len());
    }
}
