//! Error taxonomy for the floor scheduler.
//!
//! Each component gets its own error enum (mirroring how the rest of this
//! codebase scopes errors to the crate/module that raises them) rather than
//! one monolithic type.

use thiserror::Error;

/// Errors raised while validating and applying a schedule declaration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleStoreError {
    /// The declaration introduces a key already owned by a different
    /// declaration name (first-writer-wins on `ADDED`).
    #[error("declaration '{decl_name}' collides with existing key '{key}' owned by '{owner}'")]
    KeyCollision {
        /// Declaration that was rejected.
        decl_name: String,
        /// Composite `env-app` key that collided.
        key: String,
        /// Declaration name that currently owns the key.
        owner: String,
    },

    /// A window's day-selector set was empty or contained an unknown token.
    #[error("declaration '{decl_name}': invalid day selector '{selector}' for app '{app}'")]
    InvalidDaySelector {
        decl_name: String,
        app: String,
        selector: String,
    },

    /// `start` was not a parseable `"HH:MM"` string.
    #[error("declaration '{decl_name}': invalid start time '{start}' for app '{app}'")]
    InvalidStartTime {
        decl_name: String,
        app: String,
        start: String,
    },

    /// A replica count (`default-minReplicas` or `target-minReplicas`) was
    /// not a positive integer.
    #[error("declaration '{decl_name}': non-positive replica count {value} for app '{app}'")]
    NonPositiveReplicas {
        decl_name: String,
        app: String,
        value: i64,
    },

    /// The declaration's `metadata.labels.env` was missing.
    #[error("declaration '{decl_name}': missing required 'env' label")]
    MissingEnvLabel { decl_name: String },
}

/// Errors raised while ingesting an autoscaler stream event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TargetIndexError {
    /// The resource name had fewer than two `-`-separated segments, so no
    /// composite key could be derived.
    #[error("autoscaler resource '{0}' has fewer than two '-' segments, cannot derive key")]
    UnderivableKey(String),
}

/// Errors the patch client can report, classified transient vs permanent
/// per the error taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    /// Connection failure, 5xx, or throttling — the next tick will retry
    /// through the idempotence gate, no special handling needed.
    #[error("transient patch failure for {namespace}/{name}: {message}")]
    Transient {
        namespace: String,
        name: String,
        message: String,
    },

    /// 404, 403, or malformed request — logged and quarantined for 60s to
    /// avoid log flood; the decision engine keeps emitting the intent.
    #[error("permanent patch failure for {namespace}/{name}: {message}")]
    Permanent {
        namespace: String,
        name: String,
        message: String,
    },
}

impl PatchError {
    /// Whether this error should trigger per-key dispatch quarantine.
    pub fn is_permanent(&self) -> bool {
        matches!(self, PatchError::Permanent { .. })
    }
}

/// Errors raised while parsing a policy timezone at startup. Always fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("unrecognized IANA timezone '{0}'")]
    UnknownTimezone(String),
}

/// Top-level error returned from the reconciler's fatal startup paths.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}
