//! Input stream event types and the reconnect-with-backoff helper shared by
//! both the schedule stream and the autoscaler stream.
//!
//! The actual watch transport (pagination, resync, credentials) is an
//! external collaborator — modeled here only as the `WatchEvent` shape
//! each stream must produce, and `Backoff`, the pure delay calculation a
//! real watcher loop drives itself with.

use rand::Rng;
use std::time::Duration;

/// Stream event envelope: the watch kind plus the raw object. `Deleted`
/// only carries enough identity to remove the corresponding entry.
#[derive(Debug, Clone)]
pub enum WatchEvent<T> {
    Added(T),
    Modified(T),
    Deleted(DeletedRef),
}

/// Identity carried by a `DELETED` event: the orchestrator sends the full
/// last-known object on delete, but the stores only need its identity.
#[derive(Debug, Clone)]
pub struct DeletedRef {
    pub name: String,
    pub namespace: Option<String>,
}

/// Exponential backoff with jitter, bounded `[1s, 30s]`, ±20% jitter, as
/// specified for stream reconnects.
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
            current: Duration::from_secs(1),
        }
    }

    /// The next delay to wait before reconnecting, with ±20% jitter
    /// applied, and doubles the underlying delay for the attempt after.
    pub fn next_delay(&mut self) -> Duration {
        let jitter_frac = rand::thread_rng().gen_range(-0.2..=0.2);
        let jittered_secs = self.current.as_secs_f64() * (1.0 + jitter_frac);
        let delay = Duration::from_secs_f64(jittered_secs.max(0.0));

        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Reset to the base delay after a successful (re)connect.
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
