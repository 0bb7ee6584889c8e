//! Patch Client — the single outbound operation this system performs:
//! setting an autoscaler's `minReplicas` floor. The real HTTP transport is
//! out of scope; this module defines the boundary trait plus the two
//! implementations this repo needs for itself: a logging no-op (used when
//! no real client is wired up) and an in-memory recorder (tests).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::error::PatchError;

/// Outbound operation against the orchestrator's autoscaler API. Must be
/// idempotent on the external side; implementations classify failures as
/// transient or permanent per the error taxonomy.
#[async_trait]
pub trait PatchClient: Send + Sync {
    async fn set_min_replicas(
        &self,
        namespace: &str,
        name: &str,
        value: u32,
    ) -> Result<(), PatchError>;
}

/// Logs the intended patch instead of issuing it. Used when the engine is
/// run without a real orchestrator client wired in (e.g. dry runs).
pub struct LoggingPatchClient;

#[async_trait]
impl PatchClient for LoggingPatchClient {
    async fn set_min_replicas(
        &self,
        namespace: &str,
        name: &str,
        value: u32,
    ) -> Result<(), PatchError> {
        info!(namespace, name, value, "would set minReplicas (dry run)");
        Ok(())
    }
}

/// Records every patch call it receives; used by reconciler tests to
/// assert which mutations were actually dispatched.
#[derive(Default)]
pub struct RecordingPatchClient {
    calls: Mutex<Vec<(String, String, u32)>>,
    /// Namespace/name pairs that should fail with the given error on the
    /// next call, for exercising transient/permanent error handling.
    failures: Mutex<HashMap<(String, String), PatchError>>,
}

impl RecordingPatchClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, String, u32)> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    pub fn fail_next(&self, namespace: &str, name: &str, err: PatchError) {
        self.failures
            .lock()
            .expect("lock poisoned")
            .insert((namespace.to_string(), name.to_string()), err);
    }
}

#[async_trait]
impl PatchClient for RecordingPatchClient {
    async fn set_min_replicas(
        &self,
        namespace: &str,
        name: &str,
        value: u32,
    ) -> Result<(), PatchError> {
        let key = (namespace.to_string(), name.to_string());
        if let Some(err) = self.failures.lock().expect("lock poisoned").remove(&key) {
            return Err(err);
        }
        self.calls
            .lock()
            .expect("lock poisoned")
            .push((namespace.to_string(), name.to_string(), value));
        Ok(())
    }
}
