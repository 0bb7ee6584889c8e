//! Decision Engine — a pure function from `(ScheduleStoreSnapshot,
//! TargetIndexSnapshot, now)` to a set of mutation intents.
//!
//! No suspension points, no I/O, no shared mutable state: the same
//! snapshots and timestamp always yield the same intents.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::schedule::{Key, Schedule};
use crate::schedule_store::ScheduleStoreSnapshot;
use crate::target_index::TargetIndexSnapshot;

/// Why a mutation intent was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Entering an active custom window.
    WindowEnter,
    /// Leaving the last active custom window, restoring the default.
    WindowExit,
}

/// The action the reconciler must take to bring observed state into
/// alignment with the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationIntent {
    pub key: Key,
    pub hpa_name: String,
    pub namespace: String,
    pub desired_min_replicas: u32,
    pub reason: Reason,
}

/// Select the active schedule among overlapping candidates: highest
/// `target_min_replicas` wins, ties broken by earliest `start`.
fn pick_active<'a>(candidates: &[&'a Schedule]) -> &'a Schedule {
    candidates
        .iter()
        .copied()
        .max_by(|a, b| {
            a.target_min_replicas
                .cmp(&b.target_min_replicas)
                .then_with(|| {
                    // Earliest start wins on a tie, so reverse the
                    // hour/minute comparison before folding into max_by.
                    let a_start = (a.window.start_hour, a.window.start_minute);
                    let b_start = (b.window.start_hour, b.window.start_minute);
                    b_start.cmp(&a_start)
                })
        })
        .expect("candidates is non-empty")
}

/// Run the Decision Engine over a single key present in both snapshots.
fn evaluate_key(
    key: &str,
    schedule: &crate::schedule::AppSchedule,
    target: &crate::target::TargetState,
    now: DateTime<Tz>,
) -> Option<MutationIntent> {
    let active: Vec<&Schedule> = schedule
        .schedules
        .iter()
        .filter(|s| s.is_active_at(now))
        .collect();

    let (desired, reason) = if active.is_empty() {
        (schedule.default_min_replicas, Reason::WindowExit)
    } else {
        let chosen = pick_active(&active);
        (chosen.target_min_replicas, Reason::WindowEnter)
    };

    if target.observed_min_replicas == desired {
        // Idempotence gate: observed already matches desired, never emit.
        return None;
    }

    Some(MutationIntent {
        key: key.to_string(),
        hpa_name: target.hpa_name.clone(),
        namespace: target.namespace.clone(),
        desired_min_replicas: desired,
        reason,
    })
}

/// Compute the full set of mutation intents for every key present in both
/// the Schedule Store and the Target Index. Unmatched TargetStates (no
/// AppSchedule) and unmatched AppSchedules (no observed TargetState) are
/// both left untouched.
pub fn evaluate(
    schedules: &ScheduleStoreSnapshot,
    targets: &TargetIndexSnapshot,
    now: DateTime<Tz>,
) -> Vec<MutationIntent> {
    let mut intents = Vec::new();
    for (key, schedule) in schedules.apps.iter() {
        if let Some(target) = targets.get(key) {
            if let Some(intent) = evaluate_key(key, schedule, target, now) {
                intents.push(intent);
            }
        }
    }
    intents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{DaySelector, Duration, Window};
    use crate::schedule::{AppSchedule, ScaleType};
    use crate::target::TargetState;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;
    use chrono::TimeZone;

    fn central() -> Tz {
        Tz::US__Central
    }

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        central().with_ymd_and_hms(y, mo, d, h, mi, 0).single().unwrap()
    }

    fn weekday_window(start_hour: u32, start_minute: u32, dur_hours: u32, target: u32) -> Schedule {
        Schedule {
            window: Window {
                start_hour,
                start_minute,
                duration: Duration::new(dur_hours, 0),
                days: [DaySelector::Weekday].into_iter().collect::<BTreeSet<_>>(),
            },
            scale_type: ScaleType::Custom,
            target_min_replicas: target,
        }
    }

    fn snapshots(
        app_schedule: AppSchedule,
        observed_min: u32,
    ) -> (ScheduleStoreSnapshot, TargetIndexSnapshot) {
        let mut apps = HashMap::new();
        apps.insert("prod-api".to_string(), Arc::new(app_schedule));
        let schedules = ScheduleStoreSnapshot { apps: Arc::new(apps) };

        let mut targets = HashMap::new();
        targets.insert(
            "prod-api".to_string(),
            TargetState {
                hpa_name: "prod-api-hpa".to_string(),
                namespace: "prod".to_string(),
                observed_min_replicas: observed_min,
                observed_current_replicas: observed_min,
            },
        );
        let targets = TargetIndexSnapshot { targets: Arc::new(targets) };
        (schedules, targets)
    }

    #[test]
    fn enter_window_emits_intent() {
        let app = AppSchedule {
            default_min_replicas: 2,
            schedules: vec![weekday_window(9, 0, 1, 5)],
        };
        let (s, t) = snapshots(app, 2);
        // Tuesday 09:00.
        let intents = evaluate(&s, &t, dt(2026, 7, 28, 9, 0));
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].desired_min_replicas, 5);
        assert_eq!(intents[0].reason, Reason::WindowEnter);
    }

    #[test]
    fn no_intent_when_already_converged() {
        let app = AppSchedule {
            default_min_replicas: 2,
            schedules: vec![weekday_window(9, 0, 1, 5)],
        };
        let (s, t) = snapshots(app, 5);
        let intents = evaluate(&s, &t, dt(2026, 7, 28, 9, 5));
        assert!(intents.is_empty());
    }

    #[test]
    fn exit_window_restores_default() {
        let app = AppSchedule {
            default_min_replicas: 2,
            schedules: vec![weekday_window(9, 0, 1, 5)],
        };
        let (s, t) = snapshots(app, 5);
        let intents = evaluate(&s, &t, dt(2026, 7, 28, 10, 0));
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].desired_min_replicas, 2);
        assert_eq!(intents[0].reason, Reason::WindowExit);
    }

    #[test]
    fn wrong_day_no_intent() {
        let app = AppSchedule {
            default_min_replicas: 2,
            schedules: vec![weekday_window(9, 0, 1, 5)],
        };
        let (s, t) = snapshots(app, 2);
        // 2026-08-01 is a Saturday.
        let intents = evaluate(&s, &t, dt(2026, 8, 1, 9, 30));
        assert!(intents.is_empty());
    }

    #[test]
    fn overlap_picks_higher_floor() {
        let a = weekday_window(9, 0, 2, 4);
        let b = weekday_window(10, 0, 1, 7);
        let app = AppSchedule {
            default_min_replicas: 2,
            schedules: vec![a, b],
        };
        let (s, t) = snapshots(app, 2);
        let intents = evaluate(&s, &t, dt(2026, 7, 28, 10, 30));
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].desired_min_replicas, 7);
    }

    #[test]
    fn overlap_tie_break_prefers_earliest_start() {
        let a = weekday_window(9, 0, 2, 5);
        let b = weekday_window(10, 0, 1, 5);
        let app = AppSchedule {
            default_min_replicas: 2,
            schedules: vec![a, b],
        };
        let (s, t) = snapshots(app, 2);
        let intents = evaluate(&s, &t, dt(2026, 7, 28, 10, 30));
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].desired_min_replicas, 5);
    }

    #[test]
    fn invalid_scale_type_never_activates() {
        let mut sched = weekday_window(9, 0, 1, 5);
        sched.scale_type = ScaleType::Hourly;
        let app = AppSchedule {
            default_min_replicas: 2,
            schedules: vec![sched],
        };
        let (s, t) = snapshots(app, 2);
        let intents = evaluate(&s, &t, dt(2026, 7, 28, 9, 30));
        assert!(intents.is_empty());
    }

    #[test]
    fn purity_same_inputs_same_output() {
        let app = AppSchedule {
            default_min_replicas: 2,
            schedules: vec![weekday_window(9, 0, 1, 5)],
        };
        let (s, t) = snapshots(app, 2);
        let now = dt(2026, 7, 28, 9, 0);
        assert_eq!(evaluate(&s, &t, now), evaluate(&s, &t, now));
    }
}
