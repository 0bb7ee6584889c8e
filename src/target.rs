//! Target state and the raw autoscaler event ingestion boundary.

use serde::Deserialize;

use crate::schedule::Key;

/// Observed state of one external autoscaler resource.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetState {
    pub hpa_name: String,
    pub namespace: String,
    pub observed_min_replicas: u32,
    pub observed_current_replicas: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawObjectMeta {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAutoscalerSpec {
    #[serde(rename = "minReplicas")]
    pub min_replicas: u32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAutoscalerStatus {
    #[serde(rename = "currentReplicas", default)]
    pub current_replicas: u32,
}

/// The raw autoscaler object as it arrives off the autoscaler stream.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAutoscalerObject {
    pub metadata: RawObjectMeta,
    pub spec: RawAutoscalerSpec,
    #[serde(default)]
    pub status: RawAutoscalerStatus,
}

/// Derive the composite `env-app` key from an autoscaler resource name.
/// Naming convention is `<env>-<app>-<suffix>`; names with fewer than two
/// `-`-separated segments cannot be derived.
pub fn derive_key(resource_name: &str) -> Option<Key> {
    let mut parts = resource_name.splitn(3, '-');
    let env = parts.next()?;
    let app = parts.next()?;
    if env.is_empty() || app.is_empty() {
        return None;
    }
    Some(format!("{env}-{app}"))
}
