//! Reconciler Loop — the single-writer orchestrator. Subscribes to both
//! input streams and a periodic tick through one bounded channel, so the
//! Decision Engine only ever sees a fully-updated world.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::calendar::Clock;
use crate::decision::{self, MutationIntent};
use crate::patch::PatchClient;
use crate::schedule::{validate_declaration, Key};
use crate::schedule_store::ScheduleStore;
use crate::stream::{DeletedRef, WatchEvent};
use crate::target::RawAutoscalerObject;
use crate::target_index::TargetIndex;

/// One unit of work handed to the reconciler's single serialization point.
#[derive(Debug, Clone)]
pub enum Input {
    Schedule(WatchEvent<crate::schedule::RawScheduleDeclaration>),
    Autoscaler(WatchEvent<RawAutoscalerObject>),
    Tick,
}

/// Configuration the reconciler loop itself needs (distinct from process
/// config like logging/CLI — see `config.rs`).
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub tick_interval: Duration,
    pub channel_capacity: usize,
    pub quarantine_duration: Duration,
    /// Both streams silent for longer than this is a persistent failure
    /// (maps to exit code 2 at the process boundary).
    pub max_silent_duration: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            channel_capacity: 64,
            quarantine_duration: Duration::from_secs(60),
            max_silent_duration: Duration::from_secs(5 * 60),
        }
    }
}

/// Why the reconciler loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown signal closed the input channel; drained cleanly.
    Shutdown,
}

#[derive(Debug, Error)]
pub enum FatalLoopError {
    #[error("both streams silent for longer than {0:?}")]
    PersistentStreamFailure(Duration),
}

struct Quarantine {
    until: HashMap<Key, Instant>,
    duration: Duration,
}

impl Quarantine {
    fn new(duration: Duration) -> Self {
        Self {
            until: HashMap::new(),
            duration,
        }
    }

    fn is_quarantined(&self, key: &str, now: Instant) -> bool {
        self.until.get(key).is_some_and(|deadline| now < *deadline)
    }

    fn start(&mut self, key: Key, now: Instant) {
        self.until.insert(key, now + self.duration);
    }
}

/// The reconciler: owns the Schedule Store, Target Index, and per-key
/// dispatch quarantine. Single-threaded by construction — `run` is meant
/// to be spawned on exactly one task.
pub struct Reconciler<C: Clock> {
    store: ScheduleStore,
    index: TargetIndex,
    clock: Arc<C>,
    patch: Arc<dyn PatchClient>,
    quarantine: Quarantine,
    config: ReconcilerConfig,
    last_schedule_activity: Instant,
    last_autoscaler_activity: Instant,
}

impl<C: Clock> Reconciler<C> {
    pub fn new(clock: Arc<C>, patch: Arc<dyn PatchClient>, config: ReconcilerConfig) -> Self {
        let now = Instant::now();
        Self {
            store: ScheduleStore::new(),
            index: TargetIndex::new(),
            clock,
            patch,
            quarantine: Quarantine::new(config.quarantine_duration),
            config,
            last_schedule_activity: now,
            last_autoscaler_activity: now,
        }
    }

    /// Drain and process events from `rx` until it closes (shutdown) or a
    /// fatal persistent-failure condition is hit.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut rx: mpsc::Receiver<Input>) -> Result<StopReason, FatalLoopError> {
        loop {
            match rx.recv().await {
                Some(input) => {
                    self.handle_input(input);
                    self.reconcile().await;
                    self.check_persistent_failure()?;
                }
                None => {
                    info!("input channel closed, draining complete");
                    return Ok(StopReason::Shutdown);
                }
            }
        }
    }

    fn handle_input(&mut self, input: Input) {
        match input {
            Input::Schedule(ev) => {
                self.last_schedule_activity = Instant::now();
                self.handle_schedule_event(ev);
            }
            Input::Autoscaler(ev) => {
                self.last_autoscaler_activity = Instant::now();
                self.handle_autoscaler_event(ev);
            }
            Input::Tick => debug!("tick"),
        }
    }

    fn handle_schedule_event(&mut self, ev: WatchEvent<crate::schedule::RawScheduleDeclaration>) {
        match ev {
            WatchEvent::Added(raw) => match validate_declaration(raw) {
                Ok(decl) => {
                    if let Err(e) = self.store.apply_added(decl) {
                        warn!(error = %e, "rejected ADDED declaration");
                    }
                }
                Err(e) => warn!(error = %e, "rejected malformed ADDED declaration"),
            },
            WatchEvent::Modified(raw) => match validate_declaration(raw) {
                Ok(decl) => {
                    if let Err(e) = self.store.apply_modified(decl) {
                        warn!(error = %e, "rejected MODIFIED declaration");
                    }
                }
                Err(e) => warn!(error = %e, "rejected malformed MODIFIED declaration"),
            },
            WatchEvent::Deleted(DeletedRef { name, .. }) => {
                self.store.apply_deleted(&name);
            }
        }
    }

    fn handle_autoscaler_event(&mut self, ev: WatchEvent<RawAutoscalerObject>) {
        match ev {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) => {
                if let Err(e) = self.index.on_autoscaler_event(obj) {
                    warn!(error = %e, "could not ingest autoscaler event");
                }
            }
            WatchEvent::Deleted(DeletedRef { name, namespace }) => {
                self.index
                    .on_autoscaler_deleted(&name, namespace.as_deref().unwrap_or_default());
            }
        }
    }

    #[instrument(skip(self))]
    async fn reconcile(&mut self) {
        let schedules = self.store.snapshot();
        let targets = self.index.snapshot();
        let now = self.clock.now();

        let intents = decision::evaluate(&schedules, &targets, now);
        for intent in intents {
            self.dispatch(intent).await;
        }
    }

    async fn dispatch(&mut self, intent: MutationIntent) {
        let std_now = Instant::now();
        if self.quarantine.is_quarantined(&intent.key, std_now) {
            debug!(key = %intent.key, "dispatch suppressed, key quarantined");
            return;
        }

        info!(
            key = %intent.key,
            desired = intent.desired_min_replicas,
            reason = ?intent.reason,
            "dispatching mutation intent"
        );

        match self
            .patch
            .set_min_replicas(&intent.namespace, &intent.hpa_name, intent.desired_min_replicas)
            .await
        {
            Ok(()) => {}
            Err(e) => {
                error!(key = %intent.key, error = %e, "patch failed");
                if e.is_permanent() {
                    self.quarantine.start(intent.key, std_now);
                }
                // Transient failures need no special handling: the next
                // tick retries because the idempotence gate stays open.
            }
        }
    }

    fn check_persistent_failure(&self) -> Result<(), FatalLoopError> {
        let now = Instant::now();
        let schedule_silent = now.duration_since(self.last_schedule_activity);
        let autoscaler_silent = now.duration_since(self.last_autoscaler_activity);
        if schedule_silent > self.config.max_silent_duration
            && autoscaler_silent > self.config.max_silent_duration
        {
            return Err(FatalLoopError::PersistentStreamFailure(
                self.config.max_silent_duration,
            ));
        }
        Ok(())
    }
}

/// Drives the periodic tick into the reconciler's input channel at
/// `interval`, until `shutdown` fires. The tick is enqueued like any other
/// input — it never preempts an in-flight event.
pub async fn run_ticker(
    tx: mpsc::Sender<Input>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if tx.send(Input::Tick).await.is_err() {
                    return;
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

/// External collaborator boundary: the orchestrator's watch-API transport
/// (pagination, resync, credentials) is out of scope; this trait is what a
/// real watcher implementation plugs into the reconciler loop.
#[async_trait]
pub trait ApiWatcher<T>: Send {
    async fn next_event(&mut self) -> Result<WatchEvent<T>, WatcherError>;
    async fn reconnect(&mut self) -> Result<(), WatcherError>;
}

#[derive(Debug, Clone, Error)]
#[error("watch stream error: {0}")]
pub struct WatcherError(pub String);

/// Drives one `ApiWatcher` into the reconciler's input channel, forever,
/// reconnecting with exponential backoff and jitter on error. On
/// reconnect, the first re-seen state is treated as authoritative: the
/// store is never cleared on disconnect, so no `WINDOW_EXIT` intents are
/// emitted during the gap.
pub async fn drive_stream<T: Send + 'static>(
    mut watcher: impl ApiWatcher<T>,
    tx: mpsc::Sender<Input>,
    wrap: impl Fn(WatchEvent<T>) -> Input,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = crate::stream::Backoff::new();
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
            result = watcher.next_event() => {
                match result {
                    Ok(ev) => {
                        backoff.reset();
                        if tx.send(wrap(ev)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let delay = backoff.next_delay();
                        warn!(error = %e, delay = ?delay, "stream disconnected, backing off before reconnect");
                        tokio::time::sleep(delay).await;
                        if let Err(reconnect_err) = watcher.reconnect().await {
                            error!(error = %reconnect_err, "reconnect attempt failed");
                        }
                    }
                }
            }
        }
    }
}
