//! Schedule domain types and the strict ingestion boundary that turns raw,
//! loosely-typed stream payloads into validated records.

use serde::{Deserialize, Serialize};

use crate::calendar::{DaySelector, Duration, Window};
use crate::error::ScheduleStoreError;

/// Scale-type discriminator. Only `Custom` activates a window; other
/// variants are accepted and stored but never evaluated as active
/// (reserved for future hourly/periodic scaling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleType {
    Custom,
    Hourly,
    Periodic,
}

/// A window plus a target floor and scale-type discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub window: Window,
    pub scale_type: ScaleType,
    pub target_min_replicas: u32,
}

impl Schedule {
    /// Whether this schedule can ever activate (scale-type gate) and, if
    /// so, whether its window is active at `t`.
    pub fn is_active_at(&self, t: chrono::DateTime<chrono_tz::Tz>) -> bool {
        self.scale_type == ScaleType::Custom && self.window.is_active_at(t)
    }
}

/// Composite `env-app` identity.
pub type Key = String;

pub fn composite_key(env: &str, app: &str) -> Key {
    format!("{env}-{app}")
}

/// Default floor plus an ordered list of schedules for one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSchedule {
    pub default_min_replicas: u32,
    pub schedules: Vec<Schedule>,
}

// ---------------------------------------------------------------------
// Raw ingestion DTOs — shaped exactly like the wire objects the watch
// streams produce. These are intentionally loose (strings, not domain
// enums) so that `serde_json`/stream deserialization never fails on a
// single bad field; validation and rejection happen explicitly in
// `validate_declaration`.
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RawTotalDuration {
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSchedule {
    pub start: String,
    #[serde(rename = "scale-type")]
    pub scale_type: String,
    #[serde(rename = "total-duration")]
    pub total_duration: RawTotalDuration,
    #[serde(rename = "target-minReplicas")]
    pub target_min_replicas: i64,
    #[serde(default)]
    pub days: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAppEntry {
    pub name: String,
    #[serde(rename = "default-minReplicas")]
    pub default_min_replicas: i64,
    #[serde(default)]
    pub schedules: Vec<RawSchedule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMetadata {
    pub name: String,
    pub labels: RawLabels,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLabels {
    pub env: Option<String>,
}

/// The raw declaration object as it arrives off the schedule stream.
#[derive(Debug, Clone, Deserialize)]
pub struct RawScheduleDeclaration {
    pub metadata: RawMetadata,
    pub spec: Vec<RawAppEntry>,
}

/// A validated declaration: declaration name plus the set of `env-app`
/// keyed AppSchedules it introduces. Produced only by
/// [`validate_declaration`], which never returns a partially valid result —
/// either the whole declaration validates or none of it does.
#[derive(Debug, Clone)]
pub struct ValidatedDeclaration {
    pub decl_name: String,
    pub apps: Vec<(Key, AppSchedule)>,
}

fn parse_scale_type(s: &str) -> ScaleType {
    match s.to_ascii_lowercase().as_str() {
        "custom" => ScaleType::Custom,
        "hourly" => ScaleType::Hourly,
        _ => ScaleType::Periodic,
    }
}

fn validate_schedule(
    raw: &RawSchedule,
    decl_name: &str,
    app: &str,
) -> Result<Schedule, ScheduleStoreError> {
    let (start_hour, start_minute) =
        Window::parse_start(&raw.start).ok_or_else(|| ScheduleStoreError::InvalidStartTime {
            decl_name: decl_name.to_string(),
            app: app.to_string(),
            start: raw.start.clone(),
        })?;

    if raw.target_min_replicas <= 0 {
        return Err(ScheduleStoreError::NonPositiveReplicas {
            decl_name: decl_name.to_string(),
            app: app.to_string(),
            value: raw.target_min_replicas,
        });
    }

    let mut days = std::collections::BTreeSet::new();
    if raw.days.is_empty() {
        return Err(ScheduleStoreError::InvalidDaySelector {
            decl_name: decl_name.to_string(),
            app: app.to_string(),
            selector: String::new(),
        });
    }
    for d in &raw.days {
        let sel: DaySelector = d.parse().map_err(|_| ScheduleStoreError::InvalidDaySelector {
            decl_name: decl_name.to_string(),
            app: app.to_string(),
            selector: d.clone(),
        })?;
        days.insert(sel);
    }

    Ok(Schedule {
        window: Window {
            start_hour,
            start_minute,
            duration: Duration::new(raw.total_duration.hours, raw.total_duration.minutes),
            days,
        },
        scale_type: parse_scale_type(&raw.scale_type),
        target_min_replicas: raw.target_min_replicas as u32,
    })
}

/// Validate a raw declaration into a [`ValidatedDeclaration`], or reject it
/// entirely. On any validation error the whole declaration is rejected —
/// nothing partial is ever handed back to the store.
pub fn validate_declaration(
    raw: RawScheduleDeclaration,
) -> Result<ValidatedDeclaration, ScheduleStoreError> {
    let decl_name = raw.metadata.name.clone();
    let env = raw
        .metadata
        .labels
        .env
        .ok_or_else(|| ScheduleStoreError::MissingEnvLabel {
            decl_name: decl_name.clone(),
        })?;

    let mut apps = Vec::with_capacity(raw.spec.len());
    for entry in &raw.spec {
        if entry.default_min_replicas <= 0 {
            return Err(ScheduleStoreError::NonPositiveReplicas {
                decl_name: decl_name.clone(),
                app: entry.name.clone(),
                value: entry.default_min_replicas,
            });
        }

        let mut schedules = Vec::with_capacity(entry.schedules.len());
        for raw_sched in &entry.schedules {
            schedules.push(validate_schedule(raw_sched, &decl_name, &entry.name)?);
        }

        let key = composite_key(&env, &entry.name);
        apps.push((
            key,
            AppSchedule {
                default_min_replicas: entry.default_min_replicas as u32,
                schedules,
            },
        ));
    }

    Ok(ValidatedDeclaration { decl_name, apps })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw(decl: &str, env: &str, app: &str) -> RawScheduleDeclaration {
        RawScheduleDeclaration {
            metadata: RawMetadata {
                name: decl.to_string(),
                labels: RawLabels {
                    env: Some(env.to_string()),
                },
            },
            spec: vec![RawAppEntry {
                name: app.to_string(),
                default_min_replicas: 2,
                schedules: vec![RawSchedule {
                    start: "09:00".to_string(),
                    scale_type: "custom".to_string(),
                    total_duration: RawTotalDuration { hours: 1, minutes: 0 },
                    target_min_replicas: 5,
                    days: vec!["weekday".to_string()],
                }],
            }],
        }
    }

    #[test]
    fn validates_a_well_formed_declaration() {
        let raw = sample_raw("decl-a", "prod", "api");
        let validated = validate_declaration(raw).unwrap();
        assert_eq!(validated.decl_name, "decl-a");
        assert_eq!(validated.apps.len(), 1);
        assert_eq!(validated.apps[0].0, "prod-api");
    }

    #[test]
    fn rejects_bad_start_time_entirely() {
        let mut raw = sample_raw("decl-b", "prod", "api");
        raw.spec[0].schedules[0].start = "25:99".to_string();
        assert!(validate_declaration(raw).is_err());
    }

    #[test]
    fn rejects_non_positive_replicas() {
        let mut raw = sample_raw("decl-c", "prod", "api");
        raw.spec[0].default_min_replicas = 0;
        assert!(matches!(
            validate_declaration(raw),
            Err(ScheduleStoreError::NonPositiveReplicas { .. })
        ));
    }

    #[test]
    fn missing_env_label_is_rejected() {
        let mut raw = sample_raw("decl-d", "prod", "api");
        raw.metadata.labels.env = None;
        assert!(matches!(
            validate_declaration(raw),
            Err(ScheduleStoreError::MissingEnvLabel { .. })
        ));
    }

    #[test]
    fn raw_declaration_deserializes_from_wire_json() {
        let json = r#"{
            "metadata": { "name": "decl-f", "labels": { "env": "prod" } },
            "spec": [{
                "name": "api",
                "default-minReplicas": 2,
                "schedules": [{
                    "start": "09:00",
                    "scale-type": "custom",
                    "total-duration": { "hours": 1, "minutes": 30 },
                    "target-minReplicas": 6,
                    "days": ["weekday"]
                }]
            }]
        }"#;
        let raw: RawScheduleDeclaration = serde_json::from_str(json).unwrap();
        let validated = validate_declaration(raw).unwrap();
        assert_eq!(validated.apps[0].0, "prod-api");
        assert_eq!(validated.apps[0].1.schedules[0].target_min_replicas, 6);
    }

    #[test]
    fn invalid_scale_type_is_accepted_but_never_activates() {
        let mut raw = sample_raw("decl-e", "prod", "api");
        raw.spec[0].schedules[0].scale_type = "hourly".to_string();
        let validated = validate_declaration(raw).unwrap();
        let sched = &validated.apps[0].1.schedules[0];
        assert_eq!(sched.scale_type, ScaleType::Hourly);
    }
}
